//! Error types for plansmith-core
//!
//! Only run-level failures live here. Everything that goes wrong for a
//! single model is captured in its `ModelOutcome` instead.

use plansmith_llm::RegistryError;
use thiserror::Error;

/// Run-level orchestration error
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid request or configuration, detected before any backend call
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The run was cancelled before any model was dispatched
    #[error("run cancelled before dispatch")]
    Cancelled,
}

impl From<RegistryError> for OrchestratorError {
    fn from(err: RegistryError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, OrchestratorError>;
