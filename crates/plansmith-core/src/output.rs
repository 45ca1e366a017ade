//! Output persistence
//!
//! Each successful model writes its content under an artifact name derived
//! from the model name. The mapping is one-to-one: bytes outside the URL
//! unreserved set are percent-encoded, so distinct model names never share
//! an artifact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Joins a model's artifact name to the synthesis marker
///
/// `+` is always percent-encoded by [`artifact_name`], so a synthesis
/// artifact never equals a regular one.
pub const SYNTHESIS_SEPARATOR: char = '+';

/// Suffix appended to the synthesis model's artifact name
pub const SYNTHESIS_SUFFIX: &str = "synthesis";

/// File extension of written artifacts
const ARTIFACT_EXTENSION: &str = "md";

/// Output errors
#[derive(Debug, Error)]
pub enum OutputError {
    /// Filesystem failure
    #[error("failed to write artifact '{artifact}': {source}")]
    Io {
        /// Artifact name
        artifact: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Writer rejected the content
    #[error("output rejected for '{artifact}': {reason}")]
    Rejected {
        /// Artifact name
        artifact: String,
        /// Why
        reason: String,
    },
}

/// Deterministic, injective artifact name for a model
///
/// # Examples
/// ```
/// use plansmith_core::output::artifact_name;
/// assert_eq!(artifact_name("gemini-2.5-pro"), "gemini-2.5-pro");
/// assert_eq!(artifact_name("openai/gpt-4o"), "openai%2Fgpt-4o");
/// ```
#[must_use]
pub fn artifact_name(model_name: &str) -> String {
    urlencoding::encode(model_name).into_owned()
}

/// Artifact name for a synthesis pass with `model_name`
#[must_use]
pub fn synthesis_artifact_name(model_name: &str) -> String {
    format!(
        "{}{SYNTHESIS_SEPARATOR}{SYNTHESIS_SUFFIX}",
        artifact_name(model_name)
    )
}

/// Persists model output
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait OutputWriter: Send + Sync {
    /// Write `content` under `artifact` and return where it landed
    async fn write(&self, artifact: &str, content: &str) -> Result<PathBuf, OutputError>;
}

/// Writes `<dir>/<artifact>.md`
#[derive(Debug, Clone)]
pub struct FileOutputWriter {
    dir: PathBuf,
}

impl FileOutputWriter {
    /// Writer rooted at `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an artifact is written to
    #[must_use]
    pub fn path_for(&self, artifact: &str) -> PathBuf {
        self.dir.join(format!("{artifact}.{ARTIFACT_EXTENSION}"))
    }
}

#[async_trait::async_trait]
impl OutputWriter for FileOutputWriter {
    async fn write(&self, artifact: &str, content: &str) -> Result<PathBuf, OutputError> {
        let io_err = |source| OutputError::Io {
            artifact: artifact.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let path = self.path_for(artifact);
        tokio::fs::write(&path, content).await.map_err(io_err)?;

        debug!(artifact, path = %path.display(), bytes = content.len(), "artifact written");
        Ok(path)
    }
}

/// Keeps artifacts in memory, keyed by artifact name
#[derive(Debug, Default)]
pub struct MemoryOutputWriter {
    artifacts: Mutex<BTreeMap<String, String>>,
}

impl MemoryOutputWriter {
    /// Empty writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Content written under `artifact`
    #[must_use]
    pub fn get(&self, artifact: &str) -> Option<String> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(artifact)
            .cloned()
    }

    /// Every artifact name written so far, sorted
    #[must_use]
    pub fn artifacts(&self) -> Vec<String> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl OutputWriter for MemoryOutputWriter {
    async fn write(&self, artifact: &str, content: &str) -> Result<PathBuf, OutputError> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(artifact.to_string(), content.to_string());
        Ok(PathBuf::from(format!("memory://{artifact}")))
    }
}
