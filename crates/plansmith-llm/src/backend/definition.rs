//! Provider definitions
//!
//! Serde shapes for the `[[providers]]` config table and the factory each
//! one produces.

use super::client::BackendFactory;
use super::mock::MockFactory;
use super::openai_compat::{OpenAiCompatibleConfig, OpenAiCompatibleFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Wire protocol a provider speaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-style `/chat/completions` (OpenAI, OpenRouter, most gateways)
    #[default]
    OpenaiCompatible,
    /// In-process scripted backend
    Mock,
}

/// Configuration for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDefinition {
    /// Provider id referenced by model definitions
    pub id: String,
    /// Wire protocol
    #[serde(default)]
    pub kind: ProviderKind,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl ProviderDefinition {
    /// Create a definition with defaults
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            id: id.into(),
            kind,
            base_url: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Build the factory for this provider
    #[must_use]
    pub fn build_factory(&self) -> Arc<dyn BackendFactory> {
        match self.kind {
            ProviderKind::OpenaiCompatible => {
                let mut config = OpenAiCompatibleConfig::new(&self.id)
                    .with_timeout(Duration::from_secs(self.timeout_secs));
                if let Some(url) = &self.base_url {
                    config = config.with_base_url(url);
                }
                Arc::new(OpenAiCompatibleFactory::new(config))
            }
            ProviderKind::Mock => Arc::new(MockFactory::new(&self.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_defaults_from_toml() {
        let def: ProviderDefinition = toml::from_str(r#"id = "openrouter""#).unwrap();
        assert_eq!(def.kind, ProviderKind::OpenaiCompatible);
        assert_eq!(def.timeout_secs, 120);
        assert!(def.base_url.is_none());
    }

    #[test]
    fn test_build_factory_uses_id() {
        let def = ProviderDefinition::new("local", ProviderKind::Mock);
        assert_eq!(def.build_factory().provider_id(), "local");

        let def = ProviderDefinition::new("openai", ProviderKind::OpenaiCompatible);
        assert_eq!(def.build_factory().provider_id(), "openai");
    }
}
