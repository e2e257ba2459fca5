#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No query phrase was found under any indexed entry.
    #[error("no indexed entry shares a phrase with {query:?}")]
    NoMatch { query: String },

    #[error("identifier {0} was indexed more than once")]
    DuplicateIdentifier(String),

    #[error("phrase window must be at least one word, got {0}")]
    InvalidWindow(usize),

    #[error("invalid field path {path:?}: {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn is_no_match(&self) -> bool {
        matches!(self, Error::NoMatch { .. })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
