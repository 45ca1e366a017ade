//! Plansmith Core - Orchestration Engine
//!
//! This crate runs one planning prompt against many models at once:
//! - Orchestrator: validation, parallel dispatch, outcome collection, synthesis
//! - Processor: the per-model pipeline (rate limit, token check, generate, persist)
//! - Preflight: prompt token checks against each model's context window
//! - Output: artifact naming and persistence
//! - Audit: structured run and call events
//! - Utils: rate limiting and retry with backoff

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod output;
pub mod preflight;
pub mod processor;
pub mod prompt;
pub mod utils;

pub use audit::{
    AuditError, AuditEvent, AuditEventKind, AuditLogger, NoopAuditLogger, Stage,
    TracingAuditLogger,
};
pub use credentials::{default_env_var, ApiKeys};
pub use error::{OrchestratorError, Result};
pub use orchestrator::{
    OrchestrationResult, Orchestrator, OrchestratorSettings, OverallStatus, PreflightEntry,
    EXIT_CONFIGURATION_ERROR,
};
pub use outcome::{ModelOutcome, ModelStatus};
pub use output::{FileOutputWriter, MemoryOutputWriter, OutputError, OutputWriter};
pub use preflight::TokenInfo;
pub use processor::{ModelProcessor, ProcessorJob, ProcessorSettings, ProcessorState};
pub use prompt::{DefaultPromptBuilder, ModelOutput, PromptBuilder};
pub use utils::{
    ProviderRateLimiter, RateLimitError, RateLimitScope, RateLimitSettings, RatePolicy,
    RetryConfig,
};
