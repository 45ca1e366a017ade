//! Backend trait definitions
//!
//! Every provider implements `BackendFactory`, which the registry looks up by
//! provider id to build a `BackendClient` bound to one backend model.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;
use crate::token::count_prompt_tokens;
use std::sync::Arc;

/// A client bound to one backend model
#[async_trait::async_trait]
pub trait BackendClient: Send + Sync {
    /// Provider id this client belongs to
    fn provider(&self) -> &str;

    /// Backend model id requests are sent to
    fn model_id(&self) -> &str;

    /// Count prompt tokens as this backend would receive them
    ///
    /// Defaults to the local cl100k_base estimate of the prompt wrapped in one
    /// user message; backends with a native counting endpoint override this.
    async fn count_tokens(&self, prompt: &str) -> Result<usize> {
        Ok(count_prompt_tokens(prompt))
    }

    /// Generate a completion
    async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Builds clients for one provider
pub trait BackendFactory: Send + Sync {
    /// Provider id this factory is registered under
    fn provider_id(&self) -> &str;

    /// Create a client for `backend_model_id`
    ///
    /// # Errors
    /// Returns an error if the key is unusable or the HTTP client cannot be built.
    fn create(&self, api_key: &str, backend_model_id: &str) -> Result<Arc<dyn BackendClient>>;
}
