//! Model processor - the unit of work for one model
//!
//! ```text
//! Pending → RateLimitWait → TokenCheck → Generating → Succeeded
//!               │               │            │
//!               └───────────────┴────────────┴──────→ Failed
//! ```
//!
//! Every failure is folded into the returned [`ModelOutcome`]; nothing here
//! aborts the surrounding run.

use crate::audit::{emit, AuditEventKind, AuditLogger, Stage};
use crate::credentials::ApiKeys;
use crate::outcome::{ModelOutcome, ModelStatus};
use crate::output::OutputWriter;
use crate::preflight::{self, TokenInfo};
use crate::utils::{
    retry_with_backoff, ProviderRateLimiter, RateLimitError, RetryConfig, RetryError,
};
use plansmith_llm::util::sanitize_api_error;
use plansmith_llm::Registry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Processor tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorSettings {
    /// Retry policy for backend rate-limit responses
    #[serde(default)]
    pub retry: RetryConfig,
    /// Accept whitespace-only output (empty output is always a failure)
    #[serde(default)]
    pub allow_blank_output: bool,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            allow_blank_output: false,
        }
    }
}

/// Processor lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Resolving the model and building its client
    Pending,
    /// Waiting for rate limiter admission
    RateLimitWait,
    /// Counting prompt tokens
    TokenCheck,
    /// Generation call in flight
    Generating,
    /// Content generated and persisted
    Succeeded,
    /// Ended without usable output
    Failed,
}

impl ProcessorState {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::RateLimitWait => "rate_limit_wait",
            Self::TokenCheck => "token_check",
            Self::Generating => "generating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Work item for one processor invocation
#[derive(Debug, Clone)]
pub struct ProcessorJob {
    /// Registry model name
    pub model_name: String,
    /// Rendered prompt, shared across jobs
    pub prompt: Arc<str>,
    /// Artifact name the output is written under
    pub artifact: String,
    /// Regular or synthesis pass
    pub stage: Stage,
}

/// Shared collaborators for every processor in a run
#[derive(Clone)]
pub struct ModelProcessor {
    registry: Arc<Registry>,
    limiter: Arc<ProviderRateLimiter>,
    writer: Arc<dyn OutputWriter>,
    audit: Arc<dyn AuditLogger>,
    api_keys: Arc<ApiKeys>,
    settings: ProcessorSettings,
    run_id: Uuid,
}

struct Failure {
    status: ModelStatus,
    detail: String,
    attempts: u32,
}

impl Failure {
    fn new(status: ModelStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            attempts: 0,
        }
    }

    fn cancelled(during: &str) -> Self {
        Self::new(ModelStatus::Cancelled, format!("cancelled during {during}"))
    }

    fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

struct Generated {
    content: String,
    attempts: u32,
    completion_tokens: Option<u32>,
    path: PathBuf,
}

#[derive(Debug)]
enum CallError {
    Cancelled,
    Backend(plansmith_llm::Error),
}

impl CallError {
    fn is_rate_limit(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_rate_limit())
    }
}

impl ModelProcessor {
    /// Create a processor bound to one run
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        limiter: Arc<ProviderRateLimiter>,
        writer: Arc<dyn OutputWriter>,
        audit: Arc<dyn AuditLogger>,
        api_keys: Arc<ApiKeys>,
        settings: ProcessorSettings,
        run_id: Uuid,
    ) -> Self {
        Self {
            registry,
            limiter,
            writer,
            audit,
            api_keys,
            settings,
            run_id,
        }
    }

    /// Run one job to completion
    #[instrument(skip(self, cancel, job), fields(model = %job.model_name, stage = ?job.stage))]
    pub async fn process(&self, cancel: &CancellationToken, job: ProcessorJob) -> ModelOutcome {
        let started = Instant::now();
        let mut token_info = None;
        let result = self.execute(cancel, &job, &mut token_info).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(generated) => {
                self.enter(&job, ProcessorState::Succeeded);
                emit(
                    self.audit.as_ref(),
                    self.run_id,
                    AuditEventKind::CallCompleted {
                        model: job.model_name.clone(),
                        stage: job.stage,
                        prompt_tokens: token_info.map_or(0, |t| t.count),
                        completion_tokens: generated.completion_tokens,
                        attempts: generated.attempts,
                        duration_ms,
                    },
                );
                info!(
                    attempts = generated.attempts,
                    duration_ms,
                    path = %generated.path.display(),
                    "model succeeded"
                );
                ModelOutcome::success(&job.model_name, generated.content, generated.attempts)
                    .with_artifact(generated.path)
                    .with_token_info(token_info)
                    .with_duration_ms(duration_ms)
            }
            Err(failure) => {
                self.enter(&job, ProcessorState::Failed);
                emit(
                    self.audit.as_ref(),
                    self.run_id,
                    AuditEventKind::CallFailed {
                        model: job.model_name.clone(),
                        stage: job.stage,
                        status: failure.status,
                        error: failure.detail.clone(),
                        duration_ms,
                    },
                );
                warn!(
                    status = %failure.status,
                    error = %failure.detail,
                    duration_ms,
                    "model failed"
                );
                ModelOutcome::failure(&job.model_name, failure.status, failure.detail)
                    .with_token_info(token_info)
                    .with_attempts(failure.attempts)
                    .with_duration_ms(duration_ms)
            }
        }
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        job: &ProcessorJob,
        token_info: &mut Option<TokenInfo>,
    ) -> Result<Generated, Failure> {
        self.enter(job, ProcessorState::Pending);
        let spec = self
            .registry
            .resolve(&job.model_name)
            .map_err(|e| Failure::new(ModelStatus::ConfigurationError, e.to_string()))?;
        let client = self
            .registry
            .create_client(self.api_keys.get(&spec.provider_id), &spec.name)
            .map_err(|e| Failure::new(ModelStatus::ConfigurationError, e.to_string()))?;

        self.enter(job, ProcessorState::RateLimitWait);
        let permit = self
            .limiter
            .acquire(cancel, &spec.provider_id, &spec.name)
            .await
            .map_err(|e| match e {
                RateLimitError::Cancelled(_) => Failure::cancelled("rate limit wait"),
                RateLimitError::Timeout { .. } => {
                    Failure::new(ModelStatus::RateLimitTimeout, e.to_string())
                }
            })?;

        self.enter(job, ProcessorState::TokenCheck);
        let counted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Failure::cancelled("token check")),
            counted = preflight::check(client.as_ref(), &job.prompt, spec) => counted,
        };
        let info = counted.map_err(|e| {
            Failure::new(
                ModelStatus::ApiError,
                format!("token count failed: {}", sanitize_api_error(&e.to_string())),
            )
        })?;
        *token_info = Some(info);

        if info.exceeds {
            return Err(Failure::new(
                ModelStatus::TokenLimitExceeded,
                format!(
                    "prompt has {} tokens but '{}' accepts {} ({:.1}%)",
                    info.count, spec.name, info.limit, info.percentage
                ),
            ));
        }

        self.enter(job, ProcessorState::Generating);
        emit(
            self.audit.as_ref(),
            self.run_id,
            AuditEventKind::CallStarted {
                model: job.model_name.clone(),
                stage: job.stage,
                prompt_tokens: info.count,
            },
        );

        let request = spec.build_request(&job.prompt);
        let result = retry_with_backoff(
            &self.settings.retry,
            cancel,
            || {
                let client = Arc::clone(&client);
                let request = request.clone();
                async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(CallError::Cancelled),
                        response = client.generate(request) => response.map_err(CallError::Backend),
                    }
                }
            },
            CallError::is_rate_limit,
        )
        .await;
        drop(permit);

        let retried = match result {
            Ok(retried) => retried,
            Err(RetryError::Cancelled { attempts })
            | Err(RetryError::Exhausted {
                last_error: CallError::Cancelled,
                attempts,
            }) => return Err(Failure::cancelled("generation").with_attempts(attempts)),
            Err(RetryError::Exhausted {
                last_error: CallError::Backend(e),
                attempts,
            }) => {
                let failure = if e.is_rate_limit() {
                    Failure::new(
                        ModelStatus::RateLimitTimeout,
                        format!("backend still rate limiting after {attempts} attempts"),
                    )
                } else {
                    Failure::new(ModelStatus::ApiError, sanitize_api_error(&e.to_string()))
                };
                return Err(failure.with_attempts(attempts));
            }
        };

        let response = retried.value;
        let attempts = retried.attempts;
        let unusable = if self.settings.allow_blank_output {
            response.content.is_empty()
        } else {
            response.is_blank()
        };
        if unusable {
            return Err(
                Failure::new(ModelStatus::ApiError, "backend returned empty output")
                    .with_attempts(attempts),
            );
        }

        let path = self
            .writer
            .write(&job.artifact, &response.content)
            .await
            .map_err(|e| {
                Failure::new(ModelStatus::OutputError, e.to_string()).with_attempts(attempts)
            })?;

        Ok(Generated {
            completion_tokens: response.usage.map(|u| u.completion_tokens),
            content: response.content,
            attempts,
            path,
        })
    }

    fn enter(&self, job: &ProcessorJob, state: ProcessorState) {
        debug!(model = %job.model_name, state = state.as_str(), "processor state");
    }
}

#[cfg(test)]
mod tests;
