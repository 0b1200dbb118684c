use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoGraphError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("repository fetch failed: {0}")]
    FetchFailed(String),

    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("embedding failed: {0}")]
    EmbedFailed(String),

    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("vector index not ready: {0}")]
    IndexNotReady(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RepoGraphError {
    /// Stable wire identifier used in job records and error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            RepoGraphError::InvalidInput(_) => "InvalidInput",
            RepoGraphError::FetchFailed(_) => "FetchFailed",
            RepoGraphError::ParseFailed(_) => "ParseFailed",
            RepoGraphError::EmbedFailed(_) => "EmbedFailed",
            RepoGraphError::IndexUnavailable(_) => "IndexUnavailable",
            RepoGraphError::IndexNotReady(_) => "IndexNotReady",
            RepoGraphError::Timeout(_) => "Timeout",
            RepoGraphError::NotFound(_) => "NotFound",
            RepoGraphError::Io(_) | RepoGraphError::Serialization(_) => "Internal",
            RepoGraphError::Internal(_) => "Internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoGraphError>;
