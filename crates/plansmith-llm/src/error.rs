//! Error types for plansmith-llm

use thiserror::Error;

/// Backend error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Authentication rejected by the backend
    #[error("authentication error: {0}")]
    Auth(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Response blocked by the backend's safety filter
    #[error("content filtered: {0}")]
    ContentFiltered(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Client construction error
    #[error("provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Whether the backend asked us to slow down
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
