//! Run validation, dispatch and collection

use super::core::Orchestrator;
use super::types::{OrchestrationResult, OverallStatus, PreflightEntry};
use crate::audit::{emit, AuditEventKind, Stage};
use crate::error::{OrchestratorError, Result};
use crate::outcome::{ModelOutcome, ModelStatus};
use crate::output::{artifact_name, synthesis_artifact_name};
use crate::preflight::{self, TokenInfo};
use crate::processor::{ModelProcessor, ProcessorJob};
use plansmith_llm::util::sanitize_api_error;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

impl Orchestrator {
    /// Run every requested model against one prompt
    ///
    /// Per-model failures never fail the run; they are reported in
    /// [`OrchestrationResult::outcomes`]. An `Err` means nothing was
    /// dispatched: the request was invalid or `cancel` had already fired.
    #[instrument(skip(self, cancel, task, context, model_names), fields(models = model_names.len()))]
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        task: &str,
        context: &str,
        model_names: &[String],
        synthesis_model: Option<&str>,
    ) -> Result<OrchestrationResult> {
        let started = Instant::now();
        self.validate(model_names, synthesis_model)?;
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let run_id = Uuid::new_v4();
        let run_cancel = cancel.child_token();
        // Ends the deadline watcher and any straggling processor with the run.
        let _run_guard = run_cancel.clone().drop_guard();
        if let Some(timeout) = self.settings.timeout() {
            let deadline_cancel = run_cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = deadline_cancel.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        warn!(timeout_ms = timeout.as_millis() as u64, "run deadline reached, cancelling");
                        deadline_cancel.cancel();
                    }
                }
            });
        }

        emit(
            self.audit.as_ref(),
            run_id,
            AuditEventKind::RunStarted {
                models: model_names.to_vec(),
                synthesis_model: synthesis_model.map(str::to_string),
            },
        );
        info!(%run_id, "run started");

        let prompt: Arc<str> = Arc::from(self.prompts.build(task, context));
        let processor = self.processor(run_id);
        let mut outcomes = self
            .dispatch(&run_cancel, &processor, &prompt, model_names)
            .await;
        outcomes.sort_by(|a, b| a.model_name.cmp(&b.model_name));

        let mut overall_status = OverallStatus::from_outcomes(&outcomes);
        let mut synthesis = None;
        if outcomes.iter().any(|o| o.status == ModelStatus::Cancelled) {
            overall_status = OverallStatus::Aborted;
        } else if let Some(synthesis_model) = synthesis_model {
            if overall_status == OverallStatus::AllFailed {
                info!("no successful outputs, skipping synthesis");
            } else {
                let outcome = self
                    .synthesize(&run_cancel, &processor, task, synthesis_model, &outcomes)
                    .await;
                if outcome.status == ModelStatus::Cancelled {
                    overall_status = OverallStatus::Aborted;
                } else if !outcome.is_success() {
                    overall_status = OverallStatus::SynthesisFailed;
                }
                synthesis = Some(outcome);
            }
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let duration_ms = started.elapsed().as_millis() as u64;
        emit(
            self.audit.as_ref(),
            run_id,
            AuditEventKind::RunCompleted {
                overall_status: overall_status.as_str().to_string(),
                succeeded,
                total: outcomes.len(),
                duration_ms,
            },
        );
        info!(
            %run_id,
            status = %overall_status,
            succeeded,
            total = outcomes.len(),
            duration_ms,
            "run completed"
        );

        Ok(OrchestrationResult {
            run_id,
            outcomes,
            synthesis,
            overall_status,
            duration_ms,
        })
    }

    /// Count prompt tokens for every model without generating anything
    ///
    /// Entries are sorted by model name. Models that cannot be resolved or
    /// counted carry an error instead of token info.
    #[instrument(skip(self, task, context, model_names), fields(models = model_names.len()))]
    pub async fn preflight(
        &self,
        task: &str,
        context: &str,
        model_names: &[String],
    ) -> Result<Vec<PreflightEntry>> {
        self.validate(model_names, None)?;
        let prompt = self.prompts.build(task, context);

        let sorted: BTreeSet<&str> = model_names.iter().map(String::as_str).collect();
        let mut entries = Vec::with_capacity(sorted.len());
        for name in sorted {
            let entry = match self.check_one(name, &prompt).await {
                Ok(info) => PreflightEntry {
                    model_name: name.to_string(),
                    token_info: Some(info),
                    error: None,
                },
                Err(error) => PreflightEntry {
                    model_name: name.to_string(),
                    token_info: None,
                    error: Some(error),
                },
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Reject requests that cannot be dispatched
    pub(crate) fn validate(&self, model_names: &[String], synthesis_model: Option<&str>) -> Result<()> {
        if model_names.is_empty() {
            return Err(OrchestratorError::Configuration(
                "no models requested".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut artifacts = HashSet::new();
        for name in model_names {
            if name.trim().is_empty() {
                return Err(OrchestratorError::Configuration(
                    "model names must not be empty".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(OrchestratorError::Configuration(format!(
                    "model '{name}' requested more than once"
                )));
            }
            let fresh = artifacts.insert(artifact_name(name));
            debug_assert!(fresh, "artifact name of '{name}' is already taken");
        }

        if let Some(synthesis_model) = synthesis_model {
            self.registry.resolve(synthesis_model).map_err(|e| {
                OrchestratorError::Configuration(format!("synthesis model: {e}"))
            })?;
            let fresh = artifacts.insert(synthesis_artifact_name(synthesis_model));
            debug_assert!(fresh, "synthesis artifact of '{synthesis_model}' is already taken");
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        cancel: &CancellationToken,
        processor: &ModelProcessor,
        prompt: &Arc<str>,
        model_names: &[String],
    ) -> Vec<ModelOutcome> {
        let mut tasks = JoinSet::new();
        for name in model_names {
            let processor = processor.clone();
            let cancel = cancel.clone();
            let job = ProcessorJob {
                model_name: name.clone(),
                prompt: Arc::clone(prompt),
                artifact: artifact_name(name),
                stage: Stage::Model,
            };
            tasks.spawn(async move { processor.process(&cancel, job).await });
        }
        debug!(dispatched = model_names.len(), "processors spawned");

        let mut pending: BTreeSet<&str> = model_names.iter().map(String::as_str).collect();
        let mut outcomes = Vec::with_capacity(model_names.len());
        let mut grace_deadline: Option<Instant> = None;
        let mut abandoned = false;

        loop {
            let joined = tokio::select! {
                biased;
                joined = tasks.join_next() => joined,
                _ = cancel.cancelled(), if grace_deadline.is_none() => {
                    info!(pending = pending.len(), "run cancelled, waiting for processors to stop");
                    grace_deadline = Some(Instant::now() + self.settings.cancel_grace());
                    continue;
                }
                _ = tokio::time::sleep_until(grace_deadline.unwrap_or_else(Instant::now)), if grace_deadline.is_some() => {
                    warn!(pending = pending.len(), "processors ignored cancellation, aborting them");
                    tasks.abort_all();
                    abandoned = true;
                    break;
                }
            };

            match joined {
                None => break,
                Some(Ok(outcome)) => {
                    pending.remove(outcome.model_name.as_str());
                    outcomes.push(outcome);
                }
                Some(Err(e)) if e.is_panic() => warn!(error = %e, "model processor task panicked"),
                Some(Err(e)) => debug!(error = %e, "model processor task aborted"),
            }
        }

        for name in pending {
            let outcome = if abandoned {
                ModelOutcome::cancelled(name)
            } else {
                warn!(model = name, "no outcome reported, model processor panicked");
                ModelOutcome::failure(name, ModelStatus::ApiError, "model processor panicked")
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn check_one(&self, name: &str, prompt: &str) -> std::result::Result<TokenInfo, String> {
        let spec = self.registry.resolve(name).map_err(|e| e.to_string())?;
        let client = self
            .registry
            .create_client(self.api_keys.get(&spec.provider_id), name)
            .map_err(|e| e.to_string())?;
        preflight::check(client.as_ref(), prompt, spec)
            .await
            .map_err(|e| sanitize_api_error(&e.to_string()))
    }
}
