//! Backend - LLM client abstraction and provider factories
//!
//! # Module Structure
//!
//! - `client`: `BackendClient` / `BackendFactory` trait definitions
//! - `definition`: serde provider definitions and factory construction
//! - `openai_compat`: OpenAI-style chat completions over HTTP
//! - `mock`: scripted backend for tests

mod client;
mod definition;
mod mock;
pub mod openai_compat;

pub use client::{BackendClient, BackendFactory};
pub use definition::{ProviderDefinition, ProviderKind};
pub use mock::{MockBackend, MockFactory, MockReply};
pub use openai_compat::{OpenAiCompatibleClient, OpenAiCompatibleConfig, OpenAiCompatibleFactory};
