//! Orchestrator struct and builder methods

use super::config::OrchestratorSettings;
use crate::audit::{AuditLogger, TracingAuditLogger};
use crate::credentials::ApiKeys;
use crate::output::OutputWriter;
use crate::processor::ModelProcessor;
use crate::prompt::{DefaultPromptBuilder, PromptBuilder};
use crate::utils::ProviderRateLimiter;
use plansmith_llm::Registry;
use std::sync::Arc;
use uuid::Uuid;

/// Multi-model orchestrator
///
/// Holds only shared, read-mostly collaborators; one instance can serve
/// several runs concurrently.
pub struct Orchestrator {
    pub(crate) registry: Arc<Registry>,
    pub(crate) limiter: Arc<ProviderRateLimiter>,
    pub(crate) writer: Arc<dyn OutputWriter>,
    pub(crate) audit: Arc<dyn AuditLogger>,
    pub(crate) prompts: Arc<dyn PromptBuilder>,
    pub(crate) api_keys: Arc<ApiKeys>,
    pub(crate) settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Create an orchestrator with tracing audit, stock prompts and no API keys
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        limiter: Arc<ProviderRateLimiter>,
        writer: Arc<dyn OutputWriter>,
    ) -> Self {
        Self {
            registry,
            limiter,
            writer,
            audit: Arc::new(TracingAuditLogger),
            prompts: Arc::new(DefaultPromptBuilder::new()),
            api_keys: Arc::new(ApiKeys::new()),
            settings: OrchestratorSettings::default(),
        }
    }

    /// Set the audit logger
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Set the prompt builder
    #[must_use]
    pub fn with_prompt_builder(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set provider API keys
    #[must_use]
    pub fn with_api_keys(mut self, api_keys: ApiKeys) -> Self {
        self.api_keys = Arc::new(api_keys);
        self
    }

    /// Set run-level settings
    #[must_use]
    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The model registry
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The shared rate limiter
    #[must_use]
    pub fn limiter(&self) -> &ProviderRateLimiter {
        &self.limiter
    }

    /// Current settings
    #[must_use]
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub(crate) fn processor(&self, run_id: Uuid) -> ModelProcessor {
        ModelProcessor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.limiter),
            Arc::clone(&self.writer),
            Arc::clone(&self.audit),
            Arc::clone(&self.api_keys),
            self.settings.processor.clone(),
            run_id,
        )
    }
}
