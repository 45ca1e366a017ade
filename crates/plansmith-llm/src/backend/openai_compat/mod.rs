//! OpenAI-compatible backend
//!
//! Speaks the `/chat/completions` dialect shared by OpenAI, OpenRouter and
//! most self-hosted gateways.

/// Client and factory implementation
pub mod provider;
/// Configuration and wire types
pub mod types;

#[cfg(test)]
mod tests;

pub use provider::{OpenAiCompatibleClient, OpenAiCompatibleFactory};
pub use types::{OpenAiCompatibleConfig, DEFAULT_BASE_URL};
