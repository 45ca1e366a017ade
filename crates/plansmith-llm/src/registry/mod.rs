//! Registry - model metadata and backend client construction
//!
//! The registry maps model names to immutable [`ModelSpec`]s and provider ids
//! to [`BackendFactory`](crate::backend::BackendFactory) instances. It is built
//! once from configuration, validated fail-fast, and then shared read-only.
//!
//! # Module Structure
//!
//! - `types`: `ModelSpec` and typed tunable parameters
//! - `config`: serde model definitions as they appear in config files
//! - `registry_impl`: `Registry` and `RegistryError`

mod config;
mod registry_impl;
mod types;

#[cfg(test)]
mod tests;

pub use config::ModelDefinition;
pub use registry_impl::{Registry, RegistryError};
pub use types::{ModelSpec, ParameterKind, ParameterSpec, ParameterValue};
