use crate::merge::canonical_ref;
use crate::records::{value_text, CanonicalQuestion};
use crate::report::{IssueKind, MergeReport, Severity};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Exact text -> concept id lookup built from a courselets export.
///
/// Each export row is an array whose last column is the text and whose first
/// column is the concept id. Later rows win on repeated text.
#[derive(Debug, Clone, Default)]
pub struct ExactIndex {
    map: HashMap<String, Value>,
}

impl ExactIndex {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let mut map = HashMap::new();
        for row in rows {
            let (Some(val), Some(key)) = (row.first(), row.last()) else {
                continue;
            };
            map.insert(value_text(key), val.clone());
        }
        Self { map }
    }

    pub fn get(&self, text: &str) -> Option<&Value> {
        self.map.get(text)
    }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentCounts {
    pub titles: usize,
    pub errors: usize,
}

/// Attach `courseletsUL` by exact title and `courseletsError` by exact error
/// text to every question. Misses are reported as warnings.
pub fn add_courselet_ids<'a, I>(
    questions: I,
    titles: &ExactIndex,
    errors: &ExactIndex,
    report: &mut MergeReport,
) -> EnrichmentCounts
where
    I: IntoIterator<Item = &'a mut CanonicalQuestion>,
{
    let mut counts = EnrichmentCounts::default();
    for q in questions {
        match titles.get(&q.title) {
            Some(ul) => {
                q.courselets_ul = Some(ul.clone());
                counts.titles += 1;
            }
            None => report.push(Severity::Warning, canonical_ref(q), IssueKind::MissingCourseletsTitle),
        }
        let mut found = BTreeMap::new();
        for (i, text) in q.errors().iter().enumerate() {
            match errors.get(text) {
                Some(concept) => {
                    found.insert(i.to_string(), concept.clone());
                    counts.errors += 1;
                }
                None => report.push(
                    Severity::Warning,
                    canonical_ref(q),
                    IssueKind::MissingCourseletsError { position: i, text: text.clone() },
                ),
            }
        }
        if !found.is_empty() {
            q.courselets_error.get_or_insert_with(BTreeMap::new).extend(found);
        }
    }
    tracing::info!(titles = counts.titles, errors = counts.errors, "saved courselets mappings");
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(v: Value) -> Vec<Vec<Value>> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn rows_map_last_column_to_first() {
        let idx = ExactIndex::from_rows(rows(json!([[12, "extra", "Mass vs weight"], [13, "Energy"], [], [14, 7]])));
        assert_eq!(idx.get("Mass vs weight"), Some(&json!(12)));
        assert_eq!(idx.get("Energy"), Some(&json!(13)));
        assert_eq!(idx.get("7"), Some(&json!(14)));
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn enriches_titles_and_errors() {
        let mut q: CanonicalQuestion = serde_json::from_value(json!({
            "kind": "question", "rustID": "q1", "title": "Mass vs weight",
            "error": ["mass is weight", "unknown error"]
        }))
        .unwrap();
        let titles = ExactIndex::from_rows(rows(json!([[101, "Mass vs weight"]])));
        let errors = ExactIndex::from_rows(rows(json!([["Weight", "mass is weight"]])));
        let mut report = MergeReport::default();
        let counts = add_courselet_ids(std::iter::once(&mut q), &titles, &errors, &mut report);
        assert_eq!(counts, EnrichmentCounts { titles: 1, errors: 1 });
        assert_eq!(q.courselets_ul, Some(json!(101)));
        assert_eq!(q.courselets_error.as_ref().unwrap().get("0"), Some(&json!("Weight")));
        assert_eq!(report.count(Severity::Warning), 1);
        assert!(matches!(report.issues[0].kind, IssueKind::MissingCourseletsError { position: 1, .. }));
    }

    #[test]
    fn title_miss_is_reported() {
        let mut q: CanonicalQuestion =
            serde_json::from_value(json!({"kind": "question", "rustID": "q2", "title": "Torque"})).unwrap();
        let mut report = MergeReport::default();
        let counts = add_courselet_ids(std::iter::once(&mut q), &ExactIndex::default(), &ExactIndex::default(), &mut report);
        assert_eq!(counts, EnrichmentCounts::default());
        assert!(q.courselets_ul.is_none());
        assert!(q.courselets_error.is_none());
        assert_eq!(report.issues[0].kind, IssueKind::MissingCourseletsTitle);
    }
}
