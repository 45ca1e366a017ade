//! Orchestrator - fans one prompt out to many models
//!
//! A run validates the request, dispatches one [`ModelProcessor`] per model,
//! collects every outcome (sorted by model name) and optionally feeds the
//! successful outputs into a synthesis model.
//!
//! # Module Structure
//!
//! - `types`: Result types (OverallStatus, OrchestrationResult, PreflightEntry)
//! - `config`: Run-level settings (OrchestratorSettings)
//! - `core`: Orchestrator struct and builder methods
//! - `execution`: Validation, dispatch and collection
//! - `synthesis`: The optional synthesis pass
//!
//! [`ModelProcessor`]: crate::processor::ModelProcessor

mod config;
mod core;
mod execution;
mod synthesis;
mod types;


pub use config::OrchestratorSettings;
pub use self::core::Orchestrator;
pub use types::{OrchestrationResult, OverallStatus, PreflightEntry, EXIT_CONFIGURATION_ERROR};
