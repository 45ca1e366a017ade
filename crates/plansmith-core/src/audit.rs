//! Audit events
//!
//! The orchestrator and every model processor report discrete events to an
//! [`AuditLogger`]. Logger failures are reported through `tracing` and never
//! affect the run.

use crate::outcome::ModelStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Which pass a call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Regular per-model pass
    Model,
    /// Synthesis pass
    Synthesis,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEventKind {
    /// A run was accepted and is about to dispatch
    RunStarted {
        /// Requested models
        models: Vec<String>,
        /// Requested synthesis model
        synthesis_model: Option<String>,
    },
    /// A generation call is about to be issued
    CallStarted {
        /// Model name
        model: String,
        /// Pass
        stage: Stage,
        /// Prompt tokens from preflight
        prompt_tokens: usize,
    },
    /// A generation call returned content that was persisted
    CallCompleted {
        /// Model name
        model: String,
        /// Pass
        stage: Stage,
        /// Prompt tokens from preflight
        prompt_tokens: usize,
        /// Completion tokens reported by the backend
        completion_tokens: Option<u32>,
        /// Attempts made
        attempts: u32,
        /// Wall time
        duration_ms: u64,
    },
    /// A model ended without usable output
    CallFailed {
        /// Model name
        model: String,
        /// Pass
        stage: Stage,
        /// Failure classification
        status: ModelStatus,
        /// Failure detail
        error: String,
        /// Wall time
        duration_ms: u64,
    },
    /// A run finished
    RunCompleted {
        /// Overall status name
        overall_status: String,
        /// Successful regular models
        succeeded: usize,
        /// Regular models requested
        total: usize,
        /// Wall time
        duration_ms: u64,
    },
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Run this event belongs to
    pub run_id: Uuid,
    /// When the event was created
    pub timestamp: DateTime<Utc>,
    /// Payload
    #[serde(flatten)]
    pub kind: AuditEventKind,
}

impl AuditEvent {
    /// Create an event stamped with the current time
    #[must_use]
    pub fn new(run_id: Uuid, kind: AuditEventKind) -> Self {
        Self {
            run_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Audit errors
#[derive(Debug, Error)]
pub enum AuditError {
    /// Event could not be serialized
    #[error("audit serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The sink rejected the event
    #[error("audit sink failed: {0}")]
    Sink(String),
}

/// Receives audit events
#[cfg_attr(test, mockall::automock)]
pub trait AuditLogger: Send + Sync {
    /// Record one event
    ///
    /// # Errors
    /// Implementation-specific; callers only log the failure.
    fn log(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Emits each event as a JSON `tracing` record under the `plansmith::audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(event)?;
        info!(target: "plansmith::audit", run_id = %event.run_id, event = %json, "audit");
        Ok(())
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditLogger;

impl AuditLogger for NoopAuditLogger {
    fn log(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Send an event, downgrading logger failures to a warning
pub(crate) fn emit(logger: &dyn AuditLogger, run_id: Uuid, kind: AuditEventKind) {
    let event = AuditEvent::new(run_id, kind);
    if let Err(e) = logger.log(&event) {
        warn!(run_id = %run_id, error = %e, "audit logger failed, continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let run_id = Uuid::new_v4();
        let event = AuditEvent::new(
            run_id,
            AuditEventKind::CallFailed {
                model: "gpt".into(),
                stage: Stage::Model,
                status: ModelStatus::TokenLimitExceeded,
                error: "too big".into(),
                duration_ms: 12,
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "call_failed");
        assert_eq!(json["stage"], "model");
        assert_eq!(json["status"], "token_limit_exceeded");
        assert_eq!(json["run_id"], run_id.to_string());

        let back: AuditEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, event.kind);
    }

    #[test]
    fn test_emit_swallows_logger_failure() {
        let mut logger = MockAuditLogger::new();
        logger
            .expect_log()
            .times(1)
            .returning(|_| Err(AuditError::Sink("disk full".into())));

        emit(
            &logger,
            Uuid::new_v4(),
            AuditEventKind::RunStarted {
                models: vec!["a".into()],
                synthesis_model: None,
            },
        );
    }

    #[test]
    fn test_builtin_loggers_accept_events() {
        let event = AuditEvent::new(
            Uuid::new_v4(),
            AuditEventKind::CallStarted {
                model: "m".into(),
                stage: Stage::Synthesis,
                prompt_tokens: 10,
            },
        );
        assert!(TracingAuditLogger.log(&event).is_ok());
        assert!(NoopAuditLogger.log(&event).is_ok());
    }
}
