//! Orchestration result types

use crate::outcome::ModelOutcome;
use crate::preflight::TokenInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Process exit code for a run rejected before dispatch
pub const EXIT_CONFIGURATION_ERROR: u8 = 4;

/// Aggregate status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every regular model succeeded (and synthesis, if requested)
    AllSucceeded,
    /// Some regular models succeeded
    PartialSuccess,
    /// No regular model succeeded
    AllFailed,
    /// Regular models produced output but the synthesis pass failed
    SynthesisFailed,
    /// The run was cancelled or hit its deadline
    Aborted,
}

impl OverallStatus {
    /// Classify regular-model outcomes
    #[must_use]
    pub fn from_outcomes(outcomes: &[ModelOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        if succeeded == 0 {
            Self::AllFailed
        } else if succeeded == outcomes.len() {
            Self::AllSucceeded
        } else {
            Self::PartialSuccess
        }
    }

    /// Process exit code; `partial_ok` maps partial success to 0
    #[must_use]
    pub fn exit_code(&self, partial_ok: bool) -> u8 {
        match self {
            Self::AllSucceeded => 0,
            Self::PartialSuccess if partial_ok => 0,
            Self::PartialSuccess => 2,
            Self::AllFailed => 1,
            Self::SynthesisFailed => 3,
            Self::Aborted => 130,
        }
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllSucceeded => "all_succeeded",
            Self::PartialSuccess => "partial_success",
            Self::AllFailed => "all_failed",
            Self::SynthesisFailed => "synthesis_failed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Run identifier shared by every audit event of the run
    pub run_id: Uuid,
    /// Regular-model outcomes, sorted by model name
    pub outcomes: Vec<ModelOutcome>,
    /// Synthesis outcome, when the pass ran
    pub synthesis: Option<ModelOutcome>,
    /// Aggregate status
    pub overall_status: OverallStatus,
    /// Wall time of the whole run
    pub duration_ms: u64,
}

impl OrchestrationResult {
    /// Successful regular outcomes
    pub fn successes(&self) -> impl Iterator<Item = &ModelOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Outcome for one regular model
    #[must_use]
    pub fn outcome(&self, model_name: &str) -> Option<&ModelOutcome> {
        self.outcomes.iter().find(|o| o.model_name == model_name)
    }

    /// Exit code for the CLI
    #[must_use]
    pub fn exit_code(&self, partial_ok: bool) -> u8 {
        self.overall_status.exit_code(partial_ok)
    }

    /// Console summary, one line per model
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self.outcomes.iter().map(ModelOutcome::summary_line).collect();
        if let Some(synthesis) = &self.synthesis {
            lines.push(format!("synthesis: {}", synthesis.summary_line()));
        }
        lines.push(format!(
            "{} of {} models succeeded; status {} in {:.1}s",
            self.successes().count(),
            self.outcomes.len(),
            self.overall_status,
            self.duration_ms as f64 / 1000.0
        ));
        lines.join("\n")
    }
}

/// Dry-run result for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightEntry {
    /// Model name
    pub model_name: String,
    /// Token check, when the model could be resolved and counted
    pub token_info: Option<TokenInfo>,
    /// Why the model could not be checked
    pub error: Option<String>,
}

impl PreflightEntry {
    /// Whether this model would be sent the prompt
    #[must_use]
    pub fn would_run(&self) -> bool {
        matches!(self.token_info, Some(info) if !info.exceeds)
    }
}
