use std::time::Duration;
use thiserror::Error;

/// Failure of an external collaborator: corpus store, similarity oracle,
/// web search, or synthesis provider.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Request(String),

    #[error("backend not configured: {0}")]
    NotConfigured(String),

    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl BackendError {
    pub fn response(backend: &str, details: impl Into<String>) -> Self {
        Self::BackendResponse {
            backend: backend.to_string(),
            details: details.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Request-level outcome taxonomy for one query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("case retrieval failed: {0}")]
    Retrieval(#[source] BackendError),

    #[error("no relevant case law or web sources found; try rephrasing the question")]
    NoEvidence,

    #[error("answer synthesis failed: {0}")]
    Synthesis(#[source] BackendError),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

impl QueryError {
    /// The caller should rephrase rather than retry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoEvidence)
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }
}

pub type Result<T, E = BackendError> = std::result::Result<T, E>;
