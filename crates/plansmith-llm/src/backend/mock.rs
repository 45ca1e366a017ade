//! Mock backend for testing
//!
//! Replies are scripted per client and consumed in order; once the queue is
//! empty the default reply is used. Call counters let tests assert exactly
//! which backends were contacted.

use super::client::{BackendClient, BackendFactory};
use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::token::{count_prompt_tokens, count_tokens};

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted backend reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful completion with this content
    Content(String),
    /// `Error::Api` with this message
    ApiError(String),
    /// `Error::RateLimit`
    RateLimited,
    /// `Error::Network` with this message
    Network(String),
    /// Never returns; only cancellation ends the call
    Hang,
}

/// A mock backend client
pub struct MockBackend {
    provider: String,
    model_id: String,
    replies: Mutex<VecDeque<MockReply>>,
    default_reply: MockReply,
    delay: Duration,
    token_count: Option<usize>,
    generate_calls: AtomicUsize,
    count_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    /// Create a mock that answers every call with a canned plan
    #[must_use]
    pub fn new(provider: impl Into<String>, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        Self {
            provider: provider.into(),
            default_reply: MockReply::Content(format!("mock plan from {model_id}")),
            model_id,
            replies: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            token_count: None,
            generate_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply used once the scripted queue is empty
    #[must_use]
    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Queue a reply
    #[must_use]
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push_reply(reply);
        self
    }

    /// Sleep this long before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report this token count instead of the tiktoken estimate
    #[must_use]
    pub fn with_token_count(mut self, count: usize) -> Self {
        self.token_count = Some(count);
        self
    }

    /// Queue a reply on a shared instance
    pub fn push_reply(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Number of `generate` calls received
    #[must_use]
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Number of `count_tokens` calls received
    #[must_use]
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    /// Prompt text of every `generate` call, in arrival order
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

#[async_trait::async_trait]
impl BackendClient for MockBackend {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn count_tokens(&self, prompt: &str) -> Result<usize> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token_count.unwrap_or_else(|| count_prompt_tokens(prompt)))
    }

    async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.prompt_text();
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.next_reply() {
            MockReply::Content(content) => {
                let prompt_tokens = count_prompt_tokens(&prompt) as u32;
                let completion_tokens = count_tokens(&content) as u32;
                Ok(CompletionResponse {
                    content,
                    usage: Some(TokenUsage {
                        prompt_tokens,
                        completion_tokens,
                        total_tokens: prompt_tokens + completion_tokens,
                    }),
                    finish_reason: Some("stop".to_string()),
                    model: self.model_id.clone(),
                })
            }
            MockReply::ApiError(message) => Err(Error::Api(message)),
            MockReply::RateLimited => Err(Error::RateLimit),
            MockReply::Network(message) => Err(Error::Network(message)),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

/// Factory handing out pre-registered mock backends
pub struct MockFactory {
    provider_id: String,
    backends: Mutex<HashMap<String, Arc<MockBackend>>>,
    init_failures: Mutex<HashSet<String>>,
    created: AtomicUsize,
}

impl MockFactory {
    /// Create a factory for `provider_id`
    #[must_use]
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            backends: Mutex::new(HashMap::new()),
            init_failures: Mutex::new(HashSet::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Register a scripted backend, keyed by its model id
    pub fn register(&self, backend: Arc<MockBackend>) {
        self.backends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(backend.model_id().to_string(), backend);
    }

    /// Make `create` fail for this backend model id
    pub fn fail_init(&self, backend_model_id: impl Into<String>) {
        self.init_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(backend_model_id.into());
    }

    /// Backend for `backend_model_id`, created with defaults on first use
    #[must_use]
    pub fn backend(&self, backend_model_id: &str) -> Arc<MockBackend> {
        let mut backends = self.backends.lock().unwrap_or_else(|e| e.into_inner());
        backends
            .entry(backend_model_id.to_string())
            .or_insert_with(|| Arc::new(MockBackend::new(&self.provider_id, backend_model_id)))
            .clone()
    }

    /// Number of clients handed out
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Total `generate` calls across every backend of this factory
    #[must_use]
    pub fn total_generate_calls(&self) -> usize {
        self.backends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|b| b.generate_calls())
            .sum()
    }
}

impl BackendFactory for MockFactory {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn create(&self, _api_key: &str, backend_model_id: &str) -> Result<Arc<dyn BackendClient>> {
        let failing = self
            .init_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(backend_model_id);
        if failing {
            return Err(Error::Provider(format!(
                "mock init failure for {backend_model_id}"
            )));
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.backend(backend_model_id))
    }
}
