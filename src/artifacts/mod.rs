//! Artifact resolution
//!
//! Resolves tokenizer and model artifacts through a two-tier fallback chain:
//! - a local, pre-bundled directory with remote fetching disabled
//! - the canonical HuggingFace Hub source, downloaded through the persistent
//!   cache with progress reporting
//!
//! A failed remote attempt is terminal for the load attempt; there are no
//! retries beyond the two tiers.

pub mod cache;
pub mod hub;
pub mod metadata;
pub mod resolver;

pub use cache::{cached_size, default_cache_dir, is_model_cached, snapshot_path};
pub use metadata::{ModelMetadata, parse_model_config};
pub use resolver::{ArtifactResolver, ResolvedModel};
