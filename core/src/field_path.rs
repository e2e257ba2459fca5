//! Typed access into nested JSON by dotted paths such as `q.tests.0`.
//!
//! A path is parsed once into segments and then resolved against any number of
//! values. Resolution never fails: a path that leads nowhere yields
//! [`NULL`].

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Placeholder written for fields a record does not have.
pub const NULL: &str = "NULL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    /// A numeric segment; also usable as an object key (`courseletsError.0`).
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

/// Result of resolving a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Found(&'a Value),
    Missing,
}

impl<'a> Resolved<'a> {
    /// Text form for tabular output: strings unquoted, null empty, anything
    /// composite as compact JSON, missing as [`NULL`].
    pub fn to_cell(self) -> String {
        match self {
            Resolved::Missing => NULL.to_string(),
            Resolved::Found(Value::Null) => String::new(),
            Resolved::Found(Value::String(s)) => s.clone(),
            Resolved::Found(Value::Bool(b)) => b.to_string(),
            Resolved::Found(Value::Number(n)) => n.to_string(),
            Resolved::Found(v) => v.to_string(),
        }
    }
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(invalid(path, "path is empty"));
        }
        let mut segments = Vec::new();
        for part in path.split('.') {
            if part.is_empty() {
                return Err(invalid(path, "empty segment"));
            }
            segments.push(match part.parse::<usize>() {
                Ok(i) => Segment::Index(i),
                Err(_) => Segment::Key(part.to_string()),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn resolve<'a>(&self, root: &'a Value) -> Resolved<'a> {
        let mut cur = root;
        for seg in &self.segments {
            let next = match (cur, seg) {
                (Value::Object(map), Segment::Key(k)) => map.get(k),
                (Value::Object(map), Segment::Index(i)) => map.get(&i.to_string()),
                (Value::Array(items), Segment::Index(i)) => items.get(*i),
                _ => None,
            };
            match next {
                Some(v) => cur = v,
                None => return Resolved::Missing,
            }
        }
        Resolved::Found(cur)
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match seg {
                Segment::Key(k) => f.write_str(k)?,
                Segment::Index(n) => write!(f, "{n}")?,
            }
        }
        Ok(())
    }
}

fn invalid(path: &str, reason: &str) -> Error {
    Error::InvalidFieldPath { path: path.to_string(), reason: reason.to_string() }
}
