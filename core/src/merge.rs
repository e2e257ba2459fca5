use crate::config::{MergeConfig, SentinelMatcher};
use crate::error::{Error, Result};
use crate::index::PhraseIndex;
use crate::records::{Answer, CanonicalQuestion, ConceptTags, ErrorRef, LegacyErrorModel, LegacyQuestion, Response};
use crate::report::{IssueKind, MergeReport, RecordRef, Severity};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Canonical questions keyed by `rustID`. The merger mutates records in place.
pub type CanonicalSet = BTreeMap<String, CanonicalQuestion>;

/// Legacy error id -> canonical error id, for the errors that could be resolved.
pub type ErrorMapping = HashMap<ErrorRef, ErrorRef>;

/// A legacy question tagged with the canonical record it was matched to.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub rust_id: String,
    pub fraction: f64,
    pub legacy: LegacyQuestion,
}

pub struct Merger {
    config: MergeConfig,
    sentinels: SentinelMatcher,
}

impl Merger {
    pub fn new(config: MergeConfig) -> Result<Self> {
        if config.nword == 0 {
            return Err(Error::InvalidWindow(config.nword));
        }
        let sentinels = config.sentinel_matcher();
        Ok(Self { config, sentinels })
    }

    /// Match each legacy question that has responses to a canonical record by
    /// title. Unmatched questions are reported and left out.
    pub fn resolve_titles<I>(&self, canonical: &CanonicalSet, legacy: I, report: &mut MergeReport) -> Result<Vec<Resolution>>
    where
        I: IntoIterator<Item = LegacyQuestion>,
    {
        let titles = PhraseIndex::build(canonical.iter().map(|(id, q)| (id.clone(), q.title.as_str())), self.config.nword)?;
        let mut resolved = Vec::new();
        for q in legacy.into_iter().filter(|q| !q.responses.is_empty()) {
            match titles.scored_match(&q.title) {
                Ok(m) => {
                    tracing::debug!(question_id = q.question_id, rust_id = %m.id, fraction = m.fraction(), "title resolved");
                    resolved.push(Resolution { rust_id: m.id.clone(), fraction: m.fraction(), legacy: q });
                }
                Err(e) if e.is_no_match() => report.push(Severity::Skipped, legacy_ref(&q), IssueKind::UnmatchedTitle),
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    /// Map a legacy question's error models onto the canonical record's error
    /// strings. Sentinel beliefs map to themselves; beliefs that match nothing
    /// are reported and absent from the mapping.
    pub fn map_error_models(
        &self,
        canonical_errors: &[String],
        legacy_errors: &[LegacyErrorModel],
        record: &RecordRef,
        report: &mut MergeReport,
    ) -> Result<ErrorMapping> {
        let index = PhraseIndex::build(canonical_errors.iter().enumerate(), self.config.nword)?;
        let mut mapping = ErrorMapping::new();
        for em in legacy_errors {
            if self.sentinels.is_sentinel(&em.belief) {
                mapping.insert(em.error_id.clone(), ErrorRef::Label(em.belief.clone()));
                continue;
            }
            match index.best_match(&em.belief) {
                Ok(pos) => {
                    mapping.insert(em.error_id.clone(), ErrorRef::Position(pos as i64));
                }
                Err(e) if e.is_no_match() => report.push(
                    Severity::Skipped,
                    record.clone(),
                    IssueKind::UnresolvedBelief { error_id: em.error_id.to_string(), belief: em.belief.clone() },
                ),
                Err(e) => return Err(e),
            }
        }
        Ok(mapping)
    }

    /// Copy the resolved question's responses into `target` with their error
    /// ids rewritten. Returns how many responses were appended.
    pub fn merge_into(&self, target: &mut CanonicalQuestion, resolution: Resolution, report: &mut MergeReport) -> Result<usize> {
        let legacy = resolution.legacy;
        let record = legacy_ref(&legacy);
        if target.tests.is_none() {
            report.push(
                Severity::Warning,
                canonical_ref(target),
                IssueKind::MissingConceptRelation { attr: "tests".to_string() },
            );
        }
        let mapping = self.map_error_models(target.errors(), &legacy.errors, &record, report)?;

        let responses = target.responses.get_or_insert_with(Vec::new);
        let mut copied = 0;
        for (i, r) in legacy.responses.into_iter().enumerate() {
            match remap_response(r, &mapping) {
                Ok(r) => {
                    responses.push(r);
                    copied += 1;
                }
                Err(error_id) => report.push(
                    Severity::Skipped,
                    record.clone(),
                    IssueKind::ResponseDropped { response: i, error_id: error_id.to_string() },
                ),
            }
        }
        report.push(
            Severity::Info,
            record,
            IssueKind::Copied {
                rust_id: target.rust_id.clone(),
                canonical_title: target.title.clone(),
                fraction: resolution.fraction,
                responses: copied,
            },
        );
        Ok(copied)
    }

    /// Resolve every legacy question and append its responses to the matched
    /// canonical record. Running this twice over the same data appends the
    /// responses twice.
    pub fn inject_responses<I>(&self, canonical: &mut CanonicalSet, legacy: I) -> Result<MergeReport>
    where
        I: IntoIterator<Item = LegacyQuestion>,
    {
        let mut report = MergeReport::default();
        let resolved = self.resolve_titles(canonical, legacy, &mut report)?;
        for resolution in resolved {
            let Some(target) = canonical.get_mut(&resolution.rust_id) else {
                continue;
            };
            self.merge_into(target, resolution, &mut report)?;
        }
        Ok(report)
    }

    /// Full run: inject responses, then collapse answers and normalize concept
    /// tags of every canonical record.
    pub fn merge<I>(&self, canonical: &mut CanonicalSet, legacy: I) -> Result<MergeReport>
    where
        I: IntoIterator<Item = LegacyQuestion>,
    {
        let mut report = self.inject_responses(canonical, legacy)?;
        choose_default_answers(canonical.values_mut(), &mut report);
        canonicalize_concept_tags(canonical.values_mut());
        tracing::info!(
            copied = report.iter().filter(|i| matches!(i.kind, IssueKind::Copied { .. })).count(),
            skipped = report.count(Severity::Skipped),
            warnings = report.count(Severity::Warning),
            "merge complete"
        );
        Ok(report)
    }
}

/// Copy of `response` with canonical error ids, or the first legacy error id
/// that has no canonical form.
pub fn remap_response(response: Response, mapping: &ErrorMapping) -> std::result::Result<Response, ErrorRef> {
    let Response { errors, extra } = response;
    let Some(errors) = errors else {
        return Ok(Response { errors: None, extra });
    };
    let mut remapped = Vec::with_capacity(errors.len());
    for mut se in errors {
        match mapping.get(&se.error_id) {
            Some(canonical) => se.error_id = canonical.clone(),
            None => return Err(se.error_id),
        }
        remapped.push(se);
    }
    Ok(Response { errors: Some(remapped), extra })
}

/// Keep only the first candidate answer of each question.
///
/// A first candidate that is itself a list is left in place: once written out
/// it would read back as a candidate list and collapse again on the next run.
pub fn choose_default_answers<'a, I>(questions: I, report: &mut MergeReport)
where
    I: IntoIterator<Item = &'a mut CanonicalQuestion>,
{
    for q in questions {
        let first = match &q.answer {
            Some(Answer::Choices(choices)) => choices.first().cloned(),
            _ => continue,
        };
        match first {
            Some(Value::Array(_)) => report.push(Severity::Warning, canonical_ref(q), IssueKind::NestedAnswer),
            Some(first) => q.answer = Some(Answer::Single(first)),
            None => report.push(Severity::Warning, canonical_ref(q), IssueKind::EmptyAnswer),
        }
    }
}

/// Rewrite concept tags as a list of Wikipedia style titles.
pub fn canonicalize_concept_tags<'a, I>(questions: I)
where
    I: IntoIterator<Item = &'a mut CanonicalQuestion>,
{
    for q in questions {
        if let Some(tags) = q.tests.take() {
            q.tests = Some(ConceptTags::Many(normalize_concept_tags(&tags)));
        }
    }
}

/// `"Newton's_laws, Mass"` -> `["Newton's laws", "Mass"]`
pub fn normalize_concept_tags(tags: &ConceptTags) -> Vec<String> {
    let raw: &[String] = match tags {
        ConceptTags::One(s) => std::slice::from_ref(s),
        ConceptTags::Many(v) => v,
    };
    raw.iter()
        .flat_map(|s| s.split(','))
        .map(|t| t.trim().replace('_', " "))
        .collect()
}

fn legacy_ref(q: &LegacyQuestion) -> RecordRef {
    RecordRef::Legacy { question_id: q.question_id, title: q.title.clone() }
}

pub(crate) fn canonical_ref(q: &CanonicalQuestion) -> RecordRef {
    RecordRef::Canonical { rust_id: q.rust_id.clone(), title: q.title.clone() }
}
