//! Application wiring
//!
//! Turns an [`AppConfig`] into a ready-to-run [`Orchestrator`].

pub mod config;
pub mod context;
pub mod loader;

pub use config::AppConfig;

use anyhow::{Context, Result};
use plansmith_core::{ApiKeys, FileOutputWriter, Orchestrator, ProviderRateLimiter};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Build the orchestrator for one invocation
pub fn build_orchestrator(config: &AppConfig, output_dir: &Path) -> Result<Orchestrator> {
    let registry = config
        .build_registry()
        .context("Invalid model configuration")?;
    let api_keys = ApiKeys::from_env(&config.providers);
    info!(
        models = registry.model_names().len(),
        providers = registry.provider_ids().len(),
        output_dir = %output_dir.display(),
        "registry loaded"
    );

    Ok(Orchestrator::new(
        Arc::new(registry),
        Arc::new(ProviderRateLimiter::new(config.rate_limits.clone())),
        Arc::new(FileOutputWriter::new(output_dir)),
    )
    .with_api_keys(api_keys)
    .with_settings(config.orchestrator.clone()))
}
