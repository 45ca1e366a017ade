//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
///
/// Later sources win: embedded defaults, the user config directory,
/// `./plansmith.toml`, the `--config` file, then `PLANSMITH_` variables.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    load_layers(explicit, user_config_path().as_deref(), true)
}

pub(crate) fn load_layers(
    explicit: Option<&Path>,
    user_file: Option<&Path>,
    read_env: bool,
) -> Result<AppConfig> {
    // 1. Embedded defaults (always available)
    let mut builder =
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

    // 2. User and project overrides (optional)
    if let Some(path) = user_file {
        builder = builder.add_source(File::from(path).required(false));
    }
    builder = builder.add_source(File::with_name("plansmith").required(false));

    // 3. Explicit file (must exist)
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        builder = builder.add_source(File::from(path).required(true));
    }

    // 4. Environment variables (highest priority)
    if read_env {
        builder = builder.add_source(
            Environment::with_prefix("PLANSMITH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("defaults.models"),
        );
    }

    let config = builder.build().context("Failed to build configuration")?;
    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Where a user-level config file would be read from
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("plansmith").join("config.toml"))
}
