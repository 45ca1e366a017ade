//! `plansmith models`

use crate::app::AppConfig;
use anyhow::{Context, Result};
use plansmith_core::ApiKeys;
use std::process::ExitCode;

pub fn run(config: &AppConfig) -> Result<ExitCode> {
    let registry = config
        .build_registry()
        .context("Invalid model configuration")?;
    let keys = ApiKeys::from_env(&config.providers);

    println!(
        "{:<20} {:<12} {:<32} {:>10} {:>8}  KEY",
        "NAME", "PROVIDER", "BACKEND MODEL", "CONTEXT", "OUTPUT"
    );
    for name in registry.model_names() {
        let spec = registry.resolve(name)?;
        let key = if keys.contains(&spec.provider_id) { "set" } else { "missing" };
        println!(
            "{:<20} {:<12} {:<32} {:>10} {:>8}  {key}",
            spec.name,
            spec.provider_id,
            spec.backend_model_id,
            spec.context_window_tokens,
            spec.max_output_tokens
        );
    }
    Ok(ExitCode::SUCCESS)
}
