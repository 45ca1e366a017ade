//! Token preflight check
//!
//! Counts the rendered prompt with the backend client and compares it to the
//! model's context window before any generation call is made.

use plansmith_llm::{BackendClient, ModelSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prompt size relative to a model's input limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Prompt tokens
    pub count: usize,
    /// Context window of the model
    pub limit: usize,
    /// `count / limit * 100`
    pub percentage: f64,
    /// `count > limit`
    pub exceeds: bool,
}

impl TokenInfo {
    /// Compute from a count and a limit
    #[must_use]
    pub fn new(count: usize, limit: usize) -> Self {
        let percentage = if limit == 0 {
            100.0
        } else {
            count as f64 / limit as f64 * 100.0
        };
        Self {
            count,
            limit,
            percentage,
            exceeds: count > limit,
        }
    }
}

/// Count `prompt` for `spec` using the client's tokenizer
///
/// # Errors
/// Propagates the client's counting error.
pub async fn check(
    client: &dyn BackendClient,
    prompt: &str,
    spec: &ModelSpec,
) -> plansmith_llm::Result<TokenInfo> {
    let count = client.count_tokens(prompt).await?;
    let info = TokenInfo::new(count, spec.context_window_tokens);
    debug!(
        model = %spec.name,
        tokens = info.count,
        limit = info.limit,
        percentage = info.percentage,
        exceeds = info.exceeds,
        "token preflight"
    );
    Ok(info)
}
