//! Engine configuration.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables shared by every run of an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap for `parallel` groups without their own `concurrency` (None = unbounded)
    pub parallel_concurrency: Option<usize>,

    /// Iteration ceiling for `while`/`until` loops without `maxIterations` (None = unbounded)
    pub max_loop_iterations: Option<u64>,

    /// Timeout for `fetch` requests in milliseconds
    pub fetch_timeout_ms: u64,

    /// Persona used by `prompt` ops that don't name one
    pub default_persona: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_concurrency: None,
            max_loop_iterations: None,
            fetch_timeout_ms: 30_000,
            default_persona: "You are a helpful assistant.".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a config from YAML. Missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse engine config YAML")
    }

    /// Load a config from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config: {}", path.display()))?;
        Self::from_yaml(&content)
    }
}
