//! Registry implementation

use super::config::ModelDefinition;
use super::types::ModelSpec;
use crate::backend::{BackendClient, BackendFactory};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No model with this name
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The model's provider has no registered factory
    #[error("provider '{provider}' for model '{model}' is not registered")]
    ProviderNotRegistered {
        /// Model name
        model: String,
        /// Provider id
        provider: String,
    },

    /// The factory failed to build a client
    #[error("failed to initialize backend for model '{model}': {source}")]
    BackendInit {
        /// Model name
        model: String,
        /// Underlying backend error
        #[source]
        source: crate::Error,
    },

    /// Structural problem in the model configuration
    #[error("invalid model configuration: {0}")]
    Invalid(String),
}

/// Model name → spec, provider id → factory
pub struct Registry {
    models: HashMap<String, ModelSpec>,
    factories: HashMap<String, Arc<dyn BackendFactory>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.model_names())
            .field("providers", &self.provider_ids())
            .finish()
    }
}

impl Registry {
    /// Build a registry from model definitions and provider factories
    ///
    /// Validation is all-or-nothing: the first structural error aborts
    /// construction.
    ///
    /// # Errors
    /// `Invalid` for empty names, zero limits, duplicate models or factories,
    /// and parameter type mismatches; `ProviderNotRegistered` for models
    /// whose provider has no factory.
    pub fn from_config(
        definitions: Vec<ModelDefinition>,
        factories: Vec<Arc<dyn BackendFactory>>,
    ) -> Result<Self, RegistryError> {
        let mut factory_map: HashMap<String, Arc<dyn BackendFactory>> = HashMap::new();
        for factory in factories {
            let id = factory.provider_id().to_string();
            if id.trim().is_empty() {
                return Err(RegistryError::Invalid("provider id is empty".to_string()));
            }
            if factory_map.insert(id.clone(), factory).is_some() {
                return Err(RegistryError::Invalid(format!(
                    "provider '{id}' registered twice"
                )));
            }
        }

        let mut models = HashMap::new();
        for definition in definitions {
            let spec = definition.into_spec();
            Self::validate_spec(&spec)?;
            if !factory_map.contains_key(&spec.provider_id) {
                return Err(RegistryError::ProviderNotRegistered {
                    model: spec.name,
                    provider: spec.provider_id,
                });
            }
            if models.contains_key(&spec.name) {
                return Err(RegistryError::Invalid(format!(
                    "duplicate model name '{}'",
                    spec.name
                )));
            }
            debug!(
                model = %spec.name,
                provider = %spec.provider_id,
                backend_model = %spec.backend_model_id,
                context_window = spec.context_window_tokens,
                "registered model"
            );
            models.insert(spec.name.clone(), spec);
        }

        info!(
            models = models.len(),
            providers = factory_map.len(),
            "model registry initialized"
        );

        Ok(Self {
            models,
            factories: factory_map,
        })
    }

    fn validate_spec(spec: &ModelSpec) -> Result<(), RegistryError> {
        if spec.name.trim().is_empty() {
            return Err(RegistryError::Invalid("model name is empty".to_string()));
        }
        if spec.backend_model_id.trim().is_empty() {
            return Err(RegistryError::Invalid(format!(
                "model '{}' has an empty backend model id",
                spec.name
            )));
        }
        if spec.context_window_tokens == 0 {
            return Err(RegistryError::Invalid(format!(
                "model '{}' has a zero context window",
                spec.name
            )));
        }
        if spec.max_output_tokens == 0 {
            return Err(RegistryError::Invalid(format!(
                "model '{}' has zero max output tokens",
                spec.name
            )));
        }
        for (name, parameter) in &spec.parameters {
            parameter
                .validate(name)
                .map_err(|e| RegistryError::Invalid(format!("model '{}': {e}", spec.name)))?;
        }
        Ok(())
    }

    /// Look up a model
    ///
    /// # Errors
    /// `ModelNotFound` if no model has this name.
    pub fn resolve(&self, name: &str) -> Result<&ModelSpec, RegistryError> {
        self.models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }

    /// Whether a model with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// All model names, sorted
    #[must_use]
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All provider ids, sorted
    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Build a client for `name` using `api_key`
    ///
    /// # Errors
    /// `ModelNotFound`, `ProviderNotRegistered`, or `BackendInit` when the
    /// factory rejects the key or cannot build its transport.
    pub fn create_client(
        &self,
        api_key: &str,
        name: &str,
    ) -> Result<Arc<dyn BackendClient>, RegistryError> {
        let spec = self.resolve(name)?;
        let factory = self.factories.get(&spec.provider_id).ok_or_else(|| {
            RegistryError::ProviderNotRegistered {
                model: spec.name.clone(),
                provider: spec.provider_id.clone(),
            }
        })?;

        factory
            .create(api_key, &spec.backend_model_id)
            .map_err(|source| RegistryError::BackendInit {
                model: spec.name.clone(),
                source,
            })
    }
}
