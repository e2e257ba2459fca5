use crate::error::{Error, Result};
use crate::tokenizer::split_phrases;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub const DEFAULT_NWORD: usize = 2;

/// Approximate text matcher over a fixed reference corpus.
///
/// Every entry's text is cut into sliding windows of `nword` whitespace
/// separated words ("phrases"). A query is scored against each entry by the
/// fraction of that entry's own phrases that also occur in the query, so a
/// short canonical title embedded in a longer legacy title still scores 1.0.
///
/// Texts with fewer than `nword` words yield a single phrase made of all of
/// their words (the empty text yields the empty phrase).
#[derive(Debug, Clone)]
pub struct PhraseIndex<K> {
    nword: usize,
    /// phrase -> ids, one listing per occurrence of the phrase in the entry
    postings: HashMap<String, Vec<K>>,
    phrase_counts: HashMap<K, usize>,
    duplicates: Vec<K>,
}

/// Winning candidate of a query together with its raw score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<K> {
    pub id: K,
    /// Number of phrase listings of `id` hit by the query.
    pub hits: usize,
    /// Number of phrases extracted from the entry's own text.
    pub phrases: usize,
}

impl<K: Ord> Match<K> {
    pub fn fraction(&self) -> f64 {
        self.hits as f64 / self.phrases as f64
    }

    /// Orders by match fraction, then by identifier. Fractions are compared by
    /// cross-multiplication so equal ratios always tie exactly.
    fn rank(&self, other: &Self) -> Ordering {
        (self.hits * other.phrases)
            .cmp(&(other.hits * self.phrases))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl<K> PhraseIndex<K>
where
    K: Clone + Eq + Hash + Ord + Debug,
{
    /// Index `entries` with the default two-word window.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        S: AsRef<str>,
    {
        Self::from_entries(entries, DEFAULT_NWORD)
    }

    /// Index `entries` with an `nword`-word window.
    ///
    /// An identifier that appears twice keeps the phrase count of its last
    /// entry while the postings of both entries remain; such ids are listed by
    /// [`PhraseIndex::duplicates`].
    pub fn build<I, S>(entries: I, nword: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (K, S)>,
        S: AsRef<str>,
    {
        if nword == 0 {
            return Err(Error::InvalidWindow(nword));
        }
        Ok(Self::from_entries(entries, nword))
    }

    /// Like [`PhraseIndex::build`] but rejects repeated identifiers.
    pub fn build_strict<I, S>(entries: I, nword: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (K, S)>,
        S: AsRef<str>,
    {
        let index = Self::build(entries, nword)?;
        match index.duplicates.first() {
            Some(id) => Err(Error::DuplicateIdentifier(format!("{id:?}"))),
            None => Ok(index),
        }
    }

    fn from_entries<I, S>(entries: I, nword: usize) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        S: AsRef<str>,
    {
        let mut index = Self { nword, postings: HashMap::new(), phrase_counts: HashMap::new(), duplicates: Vec::new() };
        for (id, text) in entries {
            index.insert(id, text.as_ref());
        }
        if !index.duplicates.is_empty() {
            tracing::warn!(duplicates = ?index.duplicates, "identifiers indexed more than once, last phrase count wins");
        }
        index
    }

    fn insert(&mut self, id: K, text: &str) {
        let phrases = split_phrases(text, self.nword);
        if self.phrase_counts.insert(id.clone(), phrases.len()).is_some() {
            self.duplicates.push(id.clone());
        }
        for phrase in phrases {
            self.postings.entry(phrase).or_default().push(id.clone());
        }
    }

    /// Identifier of the entry whose phrases are best covered by `text`.
    ///
    /// Ties on match fraction go to the greatest identifier.
    pub fn best_match(&self, text: &str) -> Result<K> {
        self.scored_match(text).map(|m| m.id)
    }

    pub fn scored_match(&self, text: &str) -> Result<Match<K>> {
        let mut hits: HashMap<&K, usize> = HashMap::new();
        for phrase in split_phrases(text, self.nword) {
            if let Some(ids) = self.postings.get(&phrase) {
                for id in ids {
                    *hits.entry(id).or_insert(0) += 1;
                }
            }
        }
        hits.into_iter()
            .filter_map(|(id, hits)| {
                let phrases = *self.phrase_counts.get(id)?;
                Some(Match { id: id.clone(), hits, phrases })
            })
            .max_by(|a, b| a.rank(b))
            .ok_or_else(|| Error::NoMatch { query: text.to_string() })
    }

    pub fn nword(&self) -> usize { self.nword }

    /// Number of distinct identifiers indexed.
    pub fn len(&self) -> usize { self.phrase_counts.len() }

    pub fn is_empty(&self) -> bool { self.phrase_counts.is_empty() }

    pub fn phrase_count(&self, id: &K) -> Option<usize> { self.phrase_counts.get(id).copied() }

    pub fn duplicates(&self) -> &[K] { &self.duplicates }
}
