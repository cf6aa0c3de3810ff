//! HuggingFace cache-layout detection
//!
//! Lets callers tell whether a load will hit the network. Cache structure:
//! ```text
//! <cache>/models--onnx-community--Qwen3-0.6B-ONNX/
//! ├── snapshots/
//! │   └── {revision}/
//! │       ├── config.json
//! │       ├── tokenizer.json
//! │       └── onnx/model_q4.onnx
//! └── refs/
//!     └── main
//! ```
//!
//! All functions take the cache directory explicitly so tests and embedders
//! can point at isolated locations instead of mutating process environment.

use std::path::{Path, PathBuf};

/// Default HuggingFace hub cache directory.
///
/// Checks in order: `$HF_HOME/hub`, `$XDG_CACHE_HOME/huggingface/hub`,
/// `~/.cache/huggingface/hub`.
pub fn default_cache_dir() -> PathBuf {
    if let Ok(hf_home) = std::env::var("HF_HOME") {
        return PathBuf::from(hf_home).join("hub");
    }

    if let Ok(xdg_cache) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg_cache).join("huggingface/hub");
    }

    dirs::home_dir()
        .map(|h| h.join(".cache/huggingface/hub"))
        .unwrap_or_else(|| PathBuf::from("/tmp/huggingface/hub"))
}

/// HuggingFace uses `models--{org}--{name}` directory names.
fn model_cache_name(model_id: &str) -> String {
    format!("models--{}", model_id.replace('/', "--"))
}

fn snapshot_has_artifacts(path: &Path) -> bool {
    path.join("config.json").exists() || path.join("tokenizer.json").exists()
}

/// Whether any snapshot of the model exists in the cache.
pub fn is_model_cached(cache_dir: &Path, model_id: &str) -> bool {
    snapshot_path(cache_dir, model_id).is_some()
}

/// Path to the model's resolved snapshot directory, if cached.
///
/// Prefers the revision recorded in `refs/main`, falling back to the first
/// snapshot that contains artifact files.
pub fn snapshot_path(cache_dir: &Path, model_id: &str) -> Option<PathBuf> {
    let model_dir = cache_dir.join(model_cache_name(model_id));

    let refs_main = model_dir.join("refs/main");
    if refs_main.exists()
        && let Ok(revision) = std::fs::read_to_string(&refs_main)
    {
        let candidate = model_dir.join("snapshots").join(revision.trim());
        if snapshot_has_artifacts(&candidate) {
            return Some(candidate);
        }
    }

    let snapshots_dir = model_dir.join("snapshots");
    if let Ok(entries) = std::fs::read_dir(&snapshots_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if snapshot_has_artifacts(&path) {
                return Some(path);
            }
        }
    }

    None
}

/// Total size of the cached model in bytes, if cached.
pub fn cached_size(cache_dir: &Path, model_id: &str) -> Option<u64> {
    let model_dir = cache_dir.join(model_cache_name(model_id));
    if !model_dir.exists() {
        return None;
    }
    Some(dir_size(&model_dir))
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0;

    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                size += dir_size(&path);
            } else if let Ok(metadata) = std::fs::metadata(&path) {
                size += metadata.len();
            }
        }
    }

    size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_snapshot(cache_dir: &Path, model_id: &str, revision: &str) -> PathBuf {
        let model_dir = cache_dir.join(model_cache_name(model_id));
        let snapshot = model_dir.join("snapshots").join(revision);
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("config.json"), "{}").unwrap();
        std::fs::create_dir_all(model_dir.join("refs")).unwrap();
        std::fs::write(model_dir.join("refs/main"), revision).unwrap();
        snapshot
    }

    #[test]
    fn test_model_cache_name() {
        assert_eq!(
            model_cache_name("onnx-community/Qwen3-0.6B-ONNX"),
            "models--onnx-community--Qwen3-0.6B-ONNX"
        );
    }

    #[test]
    fn test_not_cached_in_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_model_cached(dir.path(), "some/model"));
        assert!(snapshot_path(dir.path(), "some/model").is_none());
        assert!(cached_size(dir.path(), "some/model").is_none());
    }

    #[test]
    fn test_snapshot_resolved_via_refs_main() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = seed_snapshot(dir.path(), "org/model", "abc123");

        assert!(is_model_cached(dir.path(), "org/model"));
        assert_eq!(snapshot_path(dir.path(), "org/model"), Some(snapshot));
    }

    #[test]
    fn test_snapshot_fallback_without_refs() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join(model_cache_name("org/model"));
        let snapshot = model_dir.join("snapshots/rev1");
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("tokenizer.json"), "{}").unwrap();

        assert_eq!(snapshot_path(dir.path(), "org/model"), Some(snapshot));
    }

    #[test]
    fn test_cached_size_counts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = seed_snapshot(dir.path(), "org/model", "rev");
        std::fs::create_dir_all(snapshot.join("onnx")).unwrap();
        std::fs::write(snapshot.join("onnx/model_q4.onnx"), vec![0u8; 16]).unwrap();

        let size = cached_size(dir.path(), "org/model").unwrap();
        // 16 weight bytes + "{}" config + refs file contents
        assert!(size >= 16);
    }
}
