//! Configuration structures and loading logic

use crate::device::Backend;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine configuration
///
/// Passed explicitly into the orchestrator; there is no process-global
/// configuration state.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Canonical remote model identifier
    pub model_id: String,

    /// Pre-bundled artifact directory tried before any remote fetch
    pub local_model_dir: PathBuf,

    /// Persistent download cache. None uses the standard HF cache location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Skip probing and pin the execution backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_backend: Option<Backend>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            local_model_dir: default_local_model_dir(),
            cache_dir: None,
            force_backend: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(model_id) = std::env::var("MUSE_ENGINE_MODEL_ID") {
            config.model_id = model_id;
        }
        if let Ok(dir) = std::env::var("MUSE_ENGINE_LOCAL_MODEL_DIR") {
            config.local_model_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("MUSE_ENGINE_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.model_id.is_empty() {
            anyhow::bail!("model_id cannot be empty");
        }
        if !self.model_id.contains('/') {
            anyhow::bail!(
                "model_id '{}' must be an org/name hub identifier",
                self.model_id
            );
        }
        if self.local_model_dir.as_os_str().is_empty() {
            anyhow::bail!("local_model_dir cannot be empty");
        }
        Ok(())
    }
}

// Default functions
fn default_model_id() -> String {
    "onnx-community/Qwen3-0.6B-ONNX".to_string()
}
fn default_local_model_dir() -> PathBuf {
    PathBuf::from("models/Qwen3-0.6B-ONNX")
}
