//! Engine configuration
//!
//! Plain data consumed by [`crate::engine::Engine::initialize`] and
//! [`crate::scene::Scene::new`]. Can be built in code or read from JSON.

use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::error::{Error, Result};
use crate::log::LogSeverity;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Application name (used in log output)
    pub app_name: String,
    /// Asset search paths, tried in order by every scene's resource manager
    pub search_paths: Vec<PathBuf>,
    /// Time every controller update with a CPU profiler
    pub enable_profiling: bool,
    /// Log entries below this severity are dropped
    pub min_log_severity: LogSeverity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: "Lumen Application".to_string(),
            search_paths: Vec::new(),
            enable_profiling: cfg!(debug_assertions),
            min_log_severity: if cfg!(debug_assertions) {
                LogSeverity::Debug
            } else {
                LogSeverity::Info
            },
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON string
    ///
    /// Missing fields keep their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InitializationFailed(format!("Invalid engine config: {}", e)))
    }

    /// Read and parse a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&content)
    }

    /// Builder-style helper appending a search path
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }
}
