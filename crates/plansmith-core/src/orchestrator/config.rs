//! Orchestrator configuration

use crate::processor::ProcessorSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Run-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Whole-run deadline in milliseconds (0 = none)
    #[serde(default)]
    pub timeout_ms: u64,
    /// How long cancelled processors get to report before they are aborted
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
    /// Per-model processor settings
    #[serde(default)]
    pub processor: ProcessorSettings,
}

fn default_cancel_grace_ms() -> u64 {
    2_000
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            cancel_grace_ms: default_cancel_grace_ms(),
            processor: ProcessorSettings::default(),
        }
    }
}

impl OrchestratorSettings {
    /// Set the run deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = crate::utils::duration_millis(timeout);
        self
    }

    /// Set processor settings
    #[must_use]
    pub fn with_processor(mut self, processor: ProcessorSettings) -> Self {
        self.processor = processor;
        self
    }

    /// Run deadline, if any
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Grace period after cancellation
    #[must_use]
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}
