use crate::index::DEFAULT_NWORD;
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_SENTINELS: &[&str] = &["(ABORT)", "(FAIL)"];

lazy_static! {
    static ref DEFAULT_SENTINEL_RE: Regex = sentinel_regex(DEFAULT_SENTINELS).expect("valid sentinel regex");
}

/// Knobs of a merge run.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Phrase window used by every index built during the run.
    pub nword: usize,
    /// A legacy belief containing any of these markers is passed through
    /// untouched instead of being matched.
    pub sentinels: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            nword: DEFAULT_NWORD,
            sentinels: DEFAULT_SENTINELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MergeConfig {
    pub fn sentinel_matcher(&self) -> SentinelMatcher {
        if self.sentinels.iter().map(String::as_str).eq(DEFAULT_SENTINELS.iter().copied()) {
            return SentinelMatcher { re: Some(DEFAULT_SENTINEL_RE.clone()) };
        }
        SentinelMatcher { re: sentinel_regex(&self.sentinels) }
    }
}

/// Recognizes terminal-state beliefs such as `"Student gave up (ABORT)"`.
#[derive(Debug, Clone)]
pub struct SentinelMatcher {
    re: Option<Regex>,
}

impl SentinelMatcher {
    pub fn is_sentinel(&self, belief: &str) -> bool {
        self.re.as_ref().is_some_and(|re| re.is_match(belief))
    }
}

impl Default for SentinelMatcher {
    fn default() -> Self {
        Self { re: Some(DEFAULT_SENTINEL_RE.clone()) }
    }
}

fn sentinel_regex<S: AsRef<str>>(markers: &[S]) -> Option<Regex> {
    let alternation: Vec<String> = markers
        .iter()
        .map(|m| m.as_ref())
        .filter(|m| !m.is_empty())
        .map(regex::escape)
        .collect();
    if alternation.is_empty() {
        return None;
    }
    Regex::new(&alternation.join("|")).ok()
}
