//! Merging of a legacy response log into canonical course content.
//!
//! The two datasets share no identifiers, so records are joined on their
//! text: [`PhraseIndex`] finds the canonical entry whose word phrases best
//! cover a given string, and [`Merger`] uses it to resolve question titles and
//! error beliefs before copying responses across.

pub mod config;
pub mod courselets;
pub mod error;
pub mod export;
pub mod field_path;
pub mod index;
pub mod merge;
pub mod persist;
pub mod records;
pub mod report;
pub mod tokenizer;

pub use config::MergeConfig;
pub use error::{Error, Result};
pub use index::{Match, PhraseIndex};
pub use merge::{CanonicalSet, Merger};
pub use records::{CanonicalQuestion, ErrorRef, LegacyExport, LegacyQuestion, Response};
pub use report::{MergeIssue, MergeReport, Severity};
