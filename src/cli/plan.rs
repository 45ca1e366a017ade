//! `plansmith plan`

use super::PlanArgs;
use crate::app::{self, context, AppConfig};
use anyhow::{Context, Result};
use plansmith_core::{OrchestratorError, OverallStatus, PreflightEntry};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Arguments merged with config defaults
#[derive(Debug, Clone, PartialEq)]
struct RunOptions {
    models: Vec<String>,
    synthesis: Option<String>,
    output_dir: PathBuf,
    partial_success_ok: bool,
}

impl RunOptions {
    fn resolve(args: &PlanArgs, config: &AppConfig) -> Self {
        let models = if args.models.is_empty() {
            config.defaults.models.clone()
        } else {
            args.models.clone()
        };
        let synthesis = if args.no_synthesis {
            None
        } else {
            args.synthesis
                .clone()
                .or_else(|| config.defaults.synthesis_model.clone())
        };
        Self {
            models,
            synthesis,
            output_dir: args
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir)),
            partial_success_ok: args.partial_success_ok || config.defaults.partial_success_ok,
        }
    }
}

pub async fn run(args: PlanArgs, mut config: AppConfig) -> Result<ExitCode> {
    let options = RunOptions::resolve(&args, &config);
    if let Some(timeout) = args.timeout {
        config.orchestrator.timeout_ms = timeout.saturating_mul(1_000);
    }

    let context = context::gather(&args.files).context("Failed to read context files")?;
    let orchestrator = app::build_orchestrator(&config, &options.output_dir)?;

    if args.dry_run {
        let entries = orchestrator
            .preflight(&args.task, &context, &options.models)
            .await?;
        return Ok(report_preflight(&entries, args.json));
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            interrupt.cancel();
        }
    });

    info!(models = ?options.models, synthesis = ?options.synthesis, "starting run");
    let result = match orchestrator
        .run(
            &cancel,
            &args.task,
            &context,
            &options.models,
            options.synthesis.as_deref(),
        )
        .await
    {
        Ok(result) => result,
        Err(OrchestratorError::Cancelled) => {
            return Ok(ExitCode::from(
                OverallStatus::Aborted.exit_code(options.partial_success_ok),
            ))
        }
        Err(err) => return Err(err.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.summary());
    }
    Ok(ExitCode::from(result.exit_code(options.partial_success_ok)))
}

fn report_preflight(entries: &[PreflightEntry], json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(entries) {
            Ok(text) => println!("{text}"),
            Err(err) => warn!(error = %err, "failed to serialize preflight report"),
        }
    } else {
        for entry in entries {
            match (&entry.token_info, &entry.error) {
                (Some(info), _) => println!(
                    "{:<24} {:>9} / {:<9} tokens ({:.1}%){}",
                    entry.model_name,
                    info.count,
                    info.limit,
                    info.percentage,
                    if info.exceeds { "  EXCEEDS LIMIT" } else { "" }
                ),
                (None, Some(error)) => println!("{:<24} error: {error}", entry.model_name),
                (None, None) => println!("{:<24} unchecked", entry.model_name),
            }
        }
    }

    if entries.iter().all(PreflightEntry::would_run) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
