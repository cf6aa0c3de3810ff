//! Model metadata parsing
//!
//! Extracts display-oriented facts (architecture, vocab size, context
//! length) from a resolved model's `config.json` so callers can render
//! model info without re-reading files.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata extracted from a causal LM's config.json.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    /// Architecture family (e.g. "qwen3", "llama")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,

    /// Hidden dimension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<u32>,

    /// Maximum context length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_position_embeddings: Option<u32>,

    /// Vocabulary size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocab_size: Option<u32>,

    /// Transformer layer count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_hidden_layers: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    model_type: Option<String>,
    hidden_size: Option<u32>,
    max_position_embeddings: Option<u32>,
    vocab_size: Option<u32>,
    num_hidden_layers: Option<u32>,
    // Some configs use alternate names
    d_model: Option<u32>,
    n_positions: Option<u32>,
}

/// Parse metadata from a directory containing `config.json`.
///
/// Returns `None` if the file is absent or unparseable; metadata is
/// informational and never blocks a load.
pub fn parse_model_config(dir: &Path) -> Option<ModelMetadata> {
    let config_path = dir.join("config.json");

    if !config_path.exists() {
        return None;
    }

    let content = std::fs::read_to_string(&config_path).ok()?;
    let raw: RawConfig = serde_json::from_str(&content).ok()?;

    Some(ModelMetadata {
        model_type: raw.model_type,
        hidden_size: raw.hidden_size.or(raw.d_model),
        max_position_embeddings: raw.max_position_embeddings.or(raw.n_positions),
        vocab_size: raw.vocab_size,
        num_hidden_layers: raw.num_hidden_layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(parse_model_config(dir.path()).is_none());
    }

    #[test]
    fn test_parse_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "not json").unwrap();
        assert!(parse_model_config(dir.path()).is_none());
    }

    #[test]
    fn test_parse_qwen_style_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{
                "model_type": "qwen3",
                "hidden_size": 1024,
                "max_position_embeddings": 40960,
                "vocab_size": 151936,
                "num_hidden_layers": 28
            }"#,
        )
        .unwrap();

        let meta = parse_model_config(dir.path()).unwrap();
        assert_eq!(meta.model_type.as_deref(), Some("qwen3"));
        assert_eq!(meta.hidden_size, Some(1024));
        assert_eq!(meta.max_position_embeddings, Some(40960));
        assert_eq!(meta.vocab_size, Some(151936));
        assert_eq!(meta.num_hidden_layers, Some(28));
    }

    #[test]
    fn test_parse_alternate_field_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"model_type": "gpt2", "d_model": 768, "n_positions": 1024}"#,
        )
        .unwrap();

        let meta = parse_model_config(dir.path()).unwrap();
        assert_eq!(meta.hidden_size, Some(768));
        assert_eq!(meta.max_position_embeddings, Some(1024));
    }
}
