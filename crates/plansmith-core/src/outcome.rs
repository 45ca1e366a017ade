//! Per-model outcome records

use crate::preflight::TokenInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Final status of one model processor run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// Content generated on the first attempt
    Success,
    /// Content generated after the backend rate-limited earlier attempts
    RateLimitedThenSucceeded,
    /// Backend, network, auth, safety-filter or empty-output failure
    ApiError,
    /// Prompt larger than the model's context window
    TokenLimitExceeded,
    /// Rate limiter admission timed out, or backend rate limiting persisted
    RateLimitTimeout,
    /// Unknown model or unusable backend configuration
    ConfigurationError,
    /// Content generated but could not be persisted
    OutputError,
    /// Run cancelled before this model finished
    Cancelled,
}

impl ModelStatus {
    /// Whether content is available
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::RateLimitedThenSucceeded)
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RateLimitedThenSucceeded => "rate_limited_then_succeeded",
            Self::ApiError => "api_error",
            Self::TokenLimitExceeded => "token_limit_exceeded",
            Self::RateLimitTimeout => "rate_limit_timeout",
            Self::ConfigurationError => "configuration_error",
            Self::OutputError => "output_error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one model processor invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutcome {
    /// Model name
    pub model_name: String,
    /// Final status
    pub status: ModelStatus,
    /// Generated content, present iff the status is a success
    pub content: Option<String>,
    /// Failure detail, present iff the status is not a success
    pub error_detail: Option<String>,
    /// Where the content was written
    pub artifact_path: Option<PathBuf>,
    /// Preflight result, when the check ran
    pub token_info: Option<TokenInfo>,
    /// Generation attempts made
    pub attempts: u32,
    /// Wall time spent on this model
    pub duration_ms: u64,
}

impl ModelOutcome {
    /// A successful outcome
    #[must_use]
    pub fn success(model_name: impl Into<String>, content: impl Into<String>, attempts: u32) -> Self {
        let status = if attempts > 1 {
            ModelStatus::RateLimitedThenSucceeded
        } else {
            ModelStatus::Success
        };
        Self {
            model_name: model_name.into(),
            status,
            content: Some(content.into()),
            error_detail: None,
            artifact_path: None,
            token_info: None,
            attempts,
            duration_ms: 0,
        }
    }

    /// A failed outcome
    ///
    /// `status` must not be a success status; success statuses are demoted
    /// to `ApiError` so `content`/`error_detail` stay consistent.
    #[must_use]
    pub fn failure(
        model_name: impl Into<String>,
        status: ModelStatus,
        detail: impl Into<String>,
    ) -> Self {
        let status = if status.is_success() {
            ModelStatus::ApiError
        } else {
            status
        };
        Self {
            model_name: model_name.into(),
            status,
            content: None,
            error_detail: Some(detail.into()),
            artifact_path: None,
            token_info: None,
            attempts: 0,
            duration_ms: 0,
        }
    }

    /// A cancelled outcome
    #[must_use]
    pub fn cancelled(model_name: impl Into<String>) -> Self {
        Self::failure(model_name, ModelStatus::Cancelled, "run cancelled")
    }

    /// Set the artifact path
    #[must_use]
    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifact_path = Some(path);
        self
    }

    /// Set the preflight result
    #[must_use]
    pub fn with_token_info(mut self, info: Option<TokenInfo>) -> Self {
        self.token_info = info;
        self
    }

    /// Set the attempt count
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the duration
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Whether content is available
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// One-line human summary
    #[must_use]
    pub fn summary_line(&self) -> String {
        let mut line = format!("{:<24} {}", self.model_name, self.status);
        if let Some(path) = &self.artifact_path {
            line.push_str(&format!("  -> {}", path.display()));
        }
        if let Some(detail) = &self.error_detail {
            line.push_str(&format!("  ({detail})"));
        }
        line
    }
}
