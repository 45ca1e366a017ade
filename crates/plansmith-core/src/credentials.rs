//! API key lookup
//!
//! Keys are resolved once, before a run, from the environment variable each
//! provider names. Values never appear in `Debug` output.

use plansmith_llm::util::mask_api_key;
use plansmith_llm::ProviderDefinition;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Provider id → API key
#[derive(Clone, Default)]
pub struct ApiKeys {
    keys: HashMap<String, String>,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (provider, key) in &self.keys {
            map.entry(provider, &mask_api_key(key));
        }
        map.finish()
    }
}

/// Conventional environment variable for a provider id: `OPENROUTER_API_KEY`
#[must_use]
pub fn default_env_var(provider_id: &str) -> String {
    let upper: String = provider_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{upper}_API_KEY")
}

impl ApiKeys {
    /// Empty key set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key
    #[must_use]
    pub fn with_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.insert(provider, key);
        self
    }

    /// Add or replace a key
    pub fn insert(&mut self, provider: impl Into<String>, key: impl Into<String>) {
        self.keys.insert(provider.into(), key.into());
    }

    /// Resolve keys for every provider from the environment
    ///
    /// Providers whose variable is unset or blank are skipped; the backend
    /// factory reports the missing key when a model on that provider runs.
    #[must_use]
    pub fn from_env(providers: &[ProviderDefinition]) -> Self {
        Self::from_lookup(providers, |name| std::env::var(name).ok())
    }

    /// Resolve keys through an arbitrary lookup function
    #[must_use]
    pub fn from_lookup<F>(providers: &[ProviderDefinition], lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut keys = Self::new();
        for provider in providers {
            let var = provider
                .api_key_env
                .clone()
                .unwrap_or_else(|| default_env_var(&provider.id));
            match lookup(&var).filter(|v| !v.trim().is_empty()) {
                Some(value) => {
                    debug!(provider = %provider.id, env = %var, "api key resolved");
                    keys.insert(provider.id.clone(), value);
                }
                None => debug!(provider = %provider.id, env = %var, "no api key in environment"),
            }
        }
        keys
    }

    /// Key for a provider, empty when none is configured
    #[must_use]
    pub fn get(&self, provider: &str) -> &str {
        self.keys.get(provider).map_or("", String::as_str)
    }

    /// Whether a key is configured for this provider
    #[must_use]
    pub fn contains(&self, provider: &str) -> bool {
        self.keys.contains_key(provider)
    }
}
