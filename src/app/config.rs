//! Application configuration types

use plansmith_core::{OrchestratorSettings, RateLimitSettings};
use plansmith_llm::{BackendFactory, ModelDefinition, ProviderDefinition, Registry, RegistryError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: Vec<ProviderDefinition>,
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
    #[serde(default)]
    pub rate_limits: RateLimitSettings,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    #[serde(default)]
    pub defaults: RunDefaults,
}

/// Values used when the command line leaves them out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub synthesis_model: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub partial_success_ok: bool,
}

fn default_output_dir() -> String {
    "plans".to_string()
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            synthesis_model: None,
            output_dir: default_output_dir(),
            partial_success_ok: false,
        }
    }
}

impl AppConfig {
    /// Build the model registry from the provider and model tables
    pub fn build_registry(&self) -> Result<Registry, RegistryError> {
        let factories: Vec<Arc<dyn BackendFactory>> = self
            .providers
            .iter()
            .map(ProviderDefinition::build_factory)
            .collect();
        Registry::from_config(self.models.clone(), factories)
    }
}
