use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    /// Data that could not be merged.
    Skipped,
}

/// Which record an issue is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "dataset", rename_all = "lowercase")]
pub enum RecordRef {
    Legacy { question_id: i64, title: String },
    Canonical { rust_id: String, title: String },
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Legacy { question_id, title } => write!(f, "legacy {question_id} {title:?}"),
            RecordRef::Canonical { rust_id, title } => write!(f, "{rust_id} {title:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IssueKind {
    /// No canonical title shares a phrase with the legacy title.
    UnmatchedTitle,
    /// Responses were copied into this canonical record.
    /// `fraction` is the title match score.
    Copied { rust_id: String, canonical_title: String, fraction: f64, responses: usize },
    /// The canonical record declares no concept relation.
    MissingConceptRelation { attr: String },
    /// A legacy belief matched none of the canonical error strings.
    UnresolvedBelief { error_id: String, belief: String },
    /// A response was dropped because one of its errors could not be remapped.
    ResponseDropped { response: usize, error_id: String },
    EmptyAnswer,
    /// The first candidate answer is a list and was not chosen.
    NestedAnswer,
    MissingCourseletsTitle,
    MissingCourseletsError { position: usize, text: String },
    UnresolvedGenericError { error_id: String },
    ErrorPositionOutOfRange { position: i64, declared: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeIssue {
    pub severity: Severity,
    pub record: RecordRef,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for MergeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.record)?;
        match &self.kind {
            IssueKind::UnmatchedTitle => write!(f, "no matching canonical title"),
            IssueKind::Copied { rust_id, canonical_title, fraction, responses } => {
                write!(f, "copied {responses} responses to {rust_id} {canonical_title:?} (title match {fraction:.2})")
            }
            IssueKind::MissingConceptRelation { attr } => write!(f, "defines no {attr:?} concept relation"),
            IssueKind::UnresolvedBelief { error_id, belief } => {
                write!(f, "error {error_id} belief {belief:?} matches no canonical error")
            }
            IssueKind::ResponseDropped { response, error_id } => {
                write!(f, "response {response} dropped, error {error_id} has no canonical form")
            }
            IssueKind::EmptyAnswer => write!(f, "answer list is empty"),
            IssueKind::NestedAnswer => write!(f, "first candidate answer is a list, answer left as is"),
            IssueKind::MissingCourseletsTitle => write!(f, "no courseletsUL for title"),
            IssueKind::MissingCourseletsError { position, text } => {
                write!(f, "no courselets error matching error {position} {text:?}")
            }
            IssueKind::UnresolvedGenericError { error_id } => write!(f, "generic error {error_id:?} matches no model"),
            IssueKind::ErrorPositionOutOfRange { position, declared } => {
                write!(f, "error position {position} outside the {declared} declared errors")
            }
        }
    }
}

/// Everything a run wants a human to audit, in the order it happened.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub issues: Vec<MergeIssue>,
}

impl MergeReport {
    pub fn push(&mut self, severity: Severity, record: RecordRef, kind: IssueKind) {
        let issue = MergeIssue { severity, record, kind };
        match severity {
            Severity::Info => tracing::info!("{issue}"),
            Severity::Warning | Severity::Skipped => tracing::warn!("{issue}"),
        }
        self.issues.push(issue);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MergeIssue> {
        self.issues.iter()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.iter().all(|i| i.severity == Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn issues_serialize_flat() {
        let mut report = MergeReport::default();
        report.push(
            Severity::Skipped,
            RecordRef::Legacy { question_id: 7, title: "Orphan".into() },
            IssueKind::UnmatchedTitle,
        );
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(
            v["issues"][0],
            json!({"severity": "skipped", "record": {"dataset": "legacy", "question_id": 7, "title": "Orphan"}, "reason": "unmatched_title"})
        );
        assert_eq!(report.count(Severity::Skipped), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn display_names_record_and_reason() {
        let issue = MergeIssue {
            severity: Severity::Warning,
            record: RecordRef::Canonical { rust_id: "q1".into(), title: "Forces".into() },
            kind: IssueKind::MissingConceptRelation { attr: "tests".into() },
        };
        assert_eq!(issue.to_string(), "q1 \"Forces\": defines no \"tests\" concept relation");
    }
}
