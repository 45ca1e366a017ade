use super::types::{
    ApiErrorBody, ApiKey, ChatMessage, ChatRequest, ChatResponse, OpenAiCompatibleConfig,
};
use crate::backend::client::{BackendClient, BackendFactory};
use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::util::sanitize_api_error;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Finish reason backends report when a safety filter blocked the output
const CONTENT_FILTER_REASON: &str = "content_filter";

// ============================================================================
// Response Mapping
// ============================================================================

/// Map a non-success HTTP status and its body to a backend error
pub(crate) fn error_for_status(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimit,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Auth(sanitize_api_error(&message))
        }
        _ => Error::Api(format!("{}: {}", status.as_u16(), sanitize_api_error(&message))),
    }
}

/// Convert a decoded chat response into a completion response
pub(crate) fn into_completion(response: ChatResponse) -> Result<CompletionResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidResponse("no choices in response".to_string()))?;

    if choice.finish_reason.as_deref() == Some(CONTENT_FILTER_REASON) {
        return Err(Error::ContentFiltered(
            "backend safety filter blocked the response".to_string(),
        ));
    }

    Ok(CompletionResponse {
        content: choice.message.content.unwrap_or_default(),
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        finish_reason: choice.finish_reason,
        model: response.model,
    })
}

fn convert_message(msg: &Message) -> ChatMessage {
    ChatMessage {
        role: msg.role.as_str().to_string(),
        content: Some(msg.content.clone()),
    }
}

pub(crate) fn build_body(model_id: &str, request: CompletionRequest) -> ChatRequest {
    let model = if request.model.is_empty() {
        model_id.to_string()
    } else {
        request.model
    };
    ChatRequest {
        model,
        messages: request.messages.iter().map(convert_message).collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request.stop,
        extra: request.extra,
    }
}

// ============================================================================
// Client Implementation
// ============================================================================

/// Client bound to one model on an OpenAI-compatible endpoint
pub struct OpenAiCompatibleClient {
    http: Client,
    config: Arc<OpenAiCompatibleConfig>,
    api_key: ApiKey,
    model_id: String,
}

impl OpenAiCompatibleClient {
    /// Create a client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        config: Arc<OpenAiCompatibleConfig>,
        api_key: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Provider(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            api_key: ApiKey(api_key.into()),
            model_id: model_id.into(),
        })
    }

    fn map_send_error(&self, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("provider", &self.config.provider_id)
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key)
            .finish()
    }
}

#[async_trait::async_trait]
impl BackendClient for OpenAiCompatibleClient {
    fn provider(&self) -> &str {
        &self.config.provider_id
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    #[instrument(skip(self, request), fields(provider = %self.config.provider_id, model = %self.model_id))]
    async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = build_body(&self.model_id, request);
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut http_request = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("Content-Type", "application/json");
        if let Some(app_name) = &self.config.app_name {
            http_request = http_request.header("X-Title", app_name);
        }

        let response = http_request
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "backend returned error status");
            return Err(error_for_status(status, &text));
        }

        let decoded: ChatResponse =
            serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))?;
        let completion = into_completion(decoded)?;

        debug!(
            finish_reason = ?completion.finish_reason,
            completion_tokens = completion.usage.as_ref().map(|u| u.completion_tokens),
            "backend completion received"
        );
        Ok(completion)
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Factory building OpenAI-compatible clients for one provider
#[derive(Debug)]
pub struct OpenAiCompatibleFactory {
    config: Arc<OpenAiCompatibleConfig>,
}

impl OpenAiCompatibleFactory {
    /// Create a factory
    #[must_use]
    pub fn new(config: OpenAiCompatibleConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl BackendFactory for OpenAiCompatibleFactory {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    fn create(&self, api_key: &str, backend_model_id: &str) -> Result<Arc<dyn BackendClient>> {
        if api_key.trim().is_empty() {
            return Err(Error::NotConfigured(format!(
                "no API key for provider {}",
                self.config.provider_id
            )));
        }
        let client =
            OpenAiCompatibleClient::new(Arc::clone(&self.config), api_key, backend_model_id)?;
        Ok(Arc::new(client))
    }
}
