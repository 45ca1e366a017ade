//! Synthesis pass

use super::core::Orchestrator;
use crate::audit::Stage;
use crate::outcome::ModelOutcome;
use crate::output::synthesis_artifact_name;
use crate::processor::{ModelProcessor, ProcessorJob};
use crate::prompt::ModelOutput;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

impl Orchestrator {
    /// Feed successful outputs to the synthesis model
    ///
    /// Runs through the same processor path as regular models, so it is
    /// rate limited, token checked and persisted the same way.
    pub(crate) async fn synthesize(
        &self,
        cancel: &CancellationToken,
        processor: &ModelProcessor,
        task: &str,
        synthesis_model: &str,
        outcomes: &[ModelOutcome],
    ) -> ModelOutcome {
        let outputs: Vec<ModelOutput> = outcomes
            .iter()
            .filter(|o| o.is_success())
            .filter_map(|o| {
                o.content.as_ref().map(|content| ModelOutput {
                    model_name: o.model_name.clone(),
                    content: content.clone(),
                })
            })
            .collect();
        info!(synthesis_model, inputs = outputs.len(), "starting synthesis");

        let job = ProcessorJob {
            model_name: synthesis_model.to_string(),
            prompt: Arc::from(self.prompts.build_synthesis(task, &outputs)),
            artifact: synthesis_artifact_name(synthesis_model),
            stage: Stage::Synthesis,
        };
        processor.process(cancel, job).await
    }
}
