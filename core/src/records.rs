use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Reference to an error model from inside a response.
///
/// Question-specific errors are positions into the question's `error` list;
/// sentinel and generic errors are carried as their belief text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorRef {
    Position(i64),
    Label(String),
}

impl fmt::Display for ErrorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorRef::Position(p) => write!(f, "{p}"),
            ErrorRef::Label(l) => f.write_str(l),
        }
    }
}

/// An error flagged on a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub error_id: ErrorRef,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ResponseError>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Error model declared by a legacy question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyErrorModel {
    pub error_id: ErrorRef,
    pub belief: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyQuestion {
    pub question_id: i64,
    pub title: String,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub errors: Vec<LegacyErrorModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LegacyQuestion {
    /// `id<TAB>title<TAB>#responses<TAB>date_added`
    pub fn summary_line(&self) -> String {
        let date = self.date_added.as_ref().map(value_text).unwrap_or_default();
        format!("{}\t{}\t{}\t{}", self.question_id, self.title, self.responses.len(), date)
    }
}

/// Top level of a legacy export: questions grouped in lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyExport {
    #[serde(default)]
    pub questions: Vec<Vec<LegacyQuestion>>,
}

impl LegacyExport {
    pub fn iter_questions(&self) -> impl Iterator<Item = &LegacyQuestion> {
        self.questions.iter().flatten()
    }

    pub fn into_questions(self) -> impl Iterator<Item = LegacyQuestion> {
        self.questions.into_iter().flatten()
    }
}

/// `answer` holds the candidate answers until the default is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Choices(Vec<Value>),
    Single(Value),
}

/// Concept tags as authored (one comma separated string) or normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConceptTags {
    One(String),
    Many(Vec<String>),
}

/// A question block of the canonical content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalQuestion {
    #[serde(rename = "rustID")]
    pub rust_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<ConceptTags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Response>>,
    #[serde(rename = "courseletsUL", default, skip_serializing_if = "Option::is_none")]
    pub courselets_ul: Option<Value>,
    /// error position -> courselets concept
    #[serde(rename = "courseletsError", default, skip_serializing_if = "Option::is_none")]
    pub courselets_error: Option<BTreeMap<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalQuestion {
    pub fn errors(&self) -> &[String] {
        self.error.as_deref().unwrap_or(&[])
    }

    pub fn response_count(&self) -> usize {
        self.responses.as_ref().map_or(0, Vec::len)
    }
}

/// Plain text of a JSON scalar: strings without quotes, anything else as JSON.
pub(crate) fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub const QUESTION_KIND: &str = "question";

pub fn is_question_block(block: &Value) -> bool {
    block.get("kind").and_then(Value::as_str) == Some(QUESTION_KIND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_question_keeps_unknown_fields() {
        let raw = json!({
            "kind": "question",
            "rustID": "q-mass",
            "title": "Mass vs weight",
            "answer": ["mass is invariant", "other"],
            "tests": "Mass,Weight_(physics)",
            "error": ["mass equals weight"],
            "text": "Explain the difference"
        });
        let q: CanonicalQuestion = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(q.rust_id, "q-mass");
        assert_eq!(q.errors(), ["mass equals weight"]);
        assert!(matches!(q.answer, Some(Answer::Choices(ref c)) if c.len() == 2));
        assert_eq!(q.extra.get("text"), Some(&json!("Explain the difference")));
        assert_eq!(serde_json::to_value(&q).unwrap(), raw);
    }

    #[test]
    fn error_refs_accept_numbers_and_text() {
        let refs: Vec<ErrorRef> = serde_json::from_value(json!([3, "(ABORT)"])).unwrap();
        assert_eq!(refs, vec![ErrorRef::Position(3), ErrorRef::Label("(ABORT)".into())]);
        assert_eq!(refs[1].to_string(), "(ABORT)");
    }

    #[test]
    fn legacy_export_flattens_groups() {
        let export: LegacyExport = serde_json::from_value(json!({
            "questions": [
                [{"question_id": 1, "title": "a", "responses": [], "errors": []}],
                [{"question_id": 2, "title": "b"}, {"question_id": 3, "title": "c"}]
            ]
        }))
        .unwrap();
        let ids: Vec<i64> = export.iter_questions().map(|q| q.question_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn summary_line_is_tab_separated() {
        let q: LegacyQuestion = serde_json::from_value(json!({
            "question_id": 12, "title": "Density", "responses": [{}, {}], "date_added": "2011-09-01"
        }))
        .unwrap();
        assert_eq!(q.summary_line(), "12\tDensity\t2\t2011-09-01");
    }

    #[test]
    fn question_block_detection() {
        assert!(is_question_block(&json!({"kind": "question"})));
        assert!(!is_question_block(&json!({"kind": "lesson"})));
        assert!(!is_question_block(&json!({"title": "x"})));
    }
}
