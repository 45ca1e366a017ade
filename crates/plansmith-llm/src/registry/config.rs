//! Model definitions as read from configuration

use super::types::{ModelSpec, ParameterSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `[[models]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Unique model name
    pub name: String,
    /// Provider id
    pub provider: String,
    /// Backend model id (defaults to `name`)
    #[serde(default)]
    pub model: Option<String>,
    /// Context window in tokens
    pub context_window: usize,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Tunable parameters
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
}

impl ModelDefinition {
    /// Create a definition without parameters
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        context_window: usize,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            model: None,
            context_window,
            max_output_tokens,
            parameters: BTreeMap::new(),
        }
    }

    /// Set the backend model id
    #[must_use]
    pub fn with_backend_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add a parameter
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    pub(crate) fn into_spec(self) -> ModelSpec {
        ModelSpec {
            backend_model_id: self.model.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            provider_id: self.provider,
            context_window_tokens: self.context_window,
            max_output_tokens: self.max_output_tokens,
            parameters: self.parameters,
        }
    }
}
