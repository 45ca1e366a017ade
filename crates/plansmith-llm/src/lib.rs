//! Plansmith LLM - Model Registry and Backend Abstraction
//!
//! This crate provides the model-facing half of Plansmith:
//! - Registry: per-model metadata and provider factory lookup
//! - Backend: the `BackendClient` / `BackendFactory` traits
//! - OpenAI-compatible: HTTP client for OpenAI and OpenRouter style APIs
//! - Mock: scripted backend for tests and offline runs
//! - Token: tiktoken-based prompt token counting

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod completion;
pub mod error;
pub mod message;
pub mod registry;
pub mod token;
pub mod util;

pub use backend::{
    BackendClient, BackendFactory, MockBackend, MockFactory, MockReply, OpenAiCompatibleClient,
    OpenAiCompatibleConfig, OpenAiCompatibleFactory, ProviderDefinition, ProviderKind,
};
pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use registry::{
    ModelDefinition, ModelSpec, ParameterKind, ParameterSpec, ParameterValue, Registry,
    RegistryError,
};
pub use token::{count_prompt_tokens, count_tokens, TokenCounter};
