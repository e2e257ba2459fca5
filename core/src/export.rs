use crate::error::Result;
use crate::field_path::FieldPath;
use crate::index::PhraseIndex;
use crate::merge::canonical_ref;
use crate::records::{value_text, CanonicalQuestion, ErrorRef};
use crate::report::{IssueKind, MergeReport, Severity};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::io::Write;

/// Columns written when none are given. Five generic and five
/// question-specific error slots.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "q.courseletsUL",
    "q.rustID",
    "r.question_id",
    "q.title",
    "q.tests.0",
    "r.username",
    "r.answer",
    "r.confidence",
    "r.selfeval",
    "r.criticisms",
    "r.submit_time",
    "genericErrors.0.courseletsError",
    "genericErrors.0.text",
    "genericErrors.0.status",
    "genericErrors.1.courseletsError",
    "genericErrors.1.text",
    "genericErrors.1.status",
    "genericErrors.2.courseletsError",
    "genericErrors.2.text",
    "genericErrors.2.status",
    "genericErrors.3.courseletsError",
    "genericErrors.3.text",
    "genericErrors.3.status",
    "genericErrors.4.courseletsError",
    "genericErrors.4.text",
    "genericErrors.4.status",
    "errors.0.courseletsError",
    "errors.0.text",
    "errors.0.status",
    "errors.1.courseletsError",
    "errors.1.text",
    "errors.1.status",
    "errors.2.courseletsError",
    "errors.2.text",
    "errors.2.status",
    "errors.3.courseletsError",
    "errors.3.text",
    "errors.3.status",
    "errors.4.courseletsError",
    "errors.4.text",
    "errors.4.status",
];

const GENERIC_COLUMNS: [&str; 4] = ["courseletsError", "isAbort", "isFail", "text"];

pub fn default_columns() -> Vec<FieldPath> {
    DEFAULT_COLUMNS.iter().filter_map(|c| FieldPath::parse(c).ok()).collect()
}

/// Error models shared by every question (abort, fail, common confusions).
#[derive(Debug, Clone)]
pub struct GenericErrors {
    models: Vec<Map<String, Value>>,
    index: PhraseIndex<usize>,
}

impl GenericErrors {
    /// Build from export rows `[courseletsError, isAbort, isFail, text]`.
    /// Rows are sorted so model positions follow ascending concept ids.
    pub fn from_rows(mut rows: Vec<Vec<Value>>) -> Self {
        rows.sort_by(|a, b| cmp_rows(a, b));
        let index = PhraseIndex::new(rows.iter().enumerate().map(|(i, row)| (i, row.last().map(value_text).unwrap_or_default())));
        let models = rows
            .into_iter()
            .map(|row| {
                GENERIC_COLUMNS
                    .iter()
                    .enumerate()
                    .map(|(i, col)| (col.to_string(), row.get(i).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect();
        Self { models, index }
    }

    pub fn len(&self) -> usize { self.models.len() }

    pub fn is_empty(&self) -> bool { self.models.is_empty() }

    pub fn matching(&self, belief: &str) -> Option<usize> {
        self.index.best_match(belief).ok()
    }
}

impl Default for GenericErrors {
    fn default() -> Self {
        Self::from_rows(Vec::new())
    }
}

/// Flatten merged questions into one row per response.
///
/// Each row is evaluated against `{q, r, errors, genericErrors}` updated with
/// the entries of `extra`, which replace built-in keys of the same name. Error
/// statuses start at 0 for every response and are set to 1 for the errors the
/// response flags.
pub fn response_rows(
    questions: &[CanonicalQuestion],
    generic: &GenericErrors,
    columns: &[FieldPath],
    extra: &Map<String, Value>,
    report: &mut MergeReport,
) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    for q in questions {
        let Some(responses) = &q.responses else {
            continue;
        };
        let q_value = serde_json::to_value(q)?;
        let question_errors = error_dicts(q);
        for r in responses {
            let mut errors = question_errors.clone();
            let declared = errors.len();
            let mut generic_status = vec![0u8; generic.len()];
            for se in r.errors.iter().flatten() {
                match &se.error_id {
                    ErrorRef::Position(p) => match usize::try_from(*p).ok().and_then(|i| errors.get_mut(i)) {
                        Some(e) => {
                            e.insert("status".into(), json!(1));
                        }
                        None => report.push(
                            Severity::Warning,
                            canonical_ref(q),
                            IssueKind::ErrorPositionOutOfRange { position: *p, declared },
                        ),
                    },
                    ErrorRef::Label(belief) => match generic.matching(belief) {
                        Some(i) => generic_status[i] = 1,
                        None => report.push(
                            Severity::Warning,
                            canonical_ref(q),
                            IssueKind::UnresolvedGenericError { error_id: belief.clone() },
                        ),
                    },
                }
            }
            let generic_errors: Vec<Value> = generic
                .models
                .iter()
                .zip(&generic_status)
                .map(|(m, status)| {
                    let mut m = m.clone();
                    m.insert("status".into(), json!(status));
                    Value::Object(m)
                })
                .collect();

            let mut ctx = Map::new();
            ctx.insert("q".into(), q_value.clone());
            ctx.insert("r".into(), serde_json::to_value(r)?);
            ctx.insert("errors".into(), Value::Array(errors.into_iter().map(Value::Object).collect()));
            ctx.insert("genericErrors".into(), Value::Array(generic_errors));
            ctx.extend(extra.clone());
            let ctx = Value::Object(ctx);
            rows.push(columns.iter().map(|c| c.resolve(&ctx).to_cell()).collect());
        }
    }
    Ok(rows)
}

/// Question errors as `{text, courseletsError?, status: 0}`.
fn error_dicts(q: &CanonicalQuestion) -> Vec<Map<String, Value>> {
    q.errors()
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let mut d = Map::new();
            d.insert("text".into(), json!(text));
            if let Some(concept) = q.courselets_error.as_ref().and_then(|m| m.get(&i.to_string())) {
                d.insert("courseletsError".into(), concept.clone());
            }
            d.insert("status".into(), json!(0));
            d
        })
        .collect()
}

pub fn write_csv<W: Write>(out: W, header: Option<&[FieldPath]>, rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    if let Some(columns) = header {
        writer.write_record(columns.iter().map(|c| c.to_string()))?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn cmp_rows(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = cmp_values(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Total order over JSON scalars: null < bool < number < string < other.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)).then_with(|| a.to_string().cmp(&b.to_string())),
    }
}
