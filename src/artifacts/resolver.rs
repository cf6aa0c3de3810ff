//! Two-tier artifact resolution
//!
//! Local bundled directory first with remote fetching disabled; on any local
//! failure the canonical remote source is attempted with progress reporting.
//! Local failures are expected and suppressed; remote failures are terminal
//! for the load attempt and carry the artifact kind.

use crate::artifacts::{cache, metadata};
use crate::device::DeviceProfile;
use crate::error::{EngineError, EngineResult};
use crate::progress::{ArtifactKind, ProgressSink};
use crate::provider::{
    ArtifactLocation, CausalModel, ChatTokenizer, LoadRequest, ModelProvider,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Model handle plus informational metadata from its config.json.
pub struct ResolvedModel {
    pub model: Arc<dyn CausalModel>,
    pub metadata: Option<metadata::ModelMetadata>,
}

/// Resolves tokenizer and model artifacts for one load attempt.
pub struct ArtifactResolver {
    provider: Arc<dyn ModelProvider>,
    local_root: PathBuf,
    remote_id: String,
    cache_dir: Option<PathBuf>,
    progress: ProgressSink,
}

impl ArtifactResolver {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        local_root: PathBuf,
        remote_id: String,
        cache_dir: Option<PathBuf>,
        progress: ProgressSink,
    ) -> Self {
        Self {
            provider,
            local_root,
            remote_id,
            cache_dir,
            progress,
        }
    }

    fn local_request(&self, profile: DeviceProfile) -> LoadRequest {
        LoadRequest {
            location: ArtifactLocation::Local(self.local_root.clone()),
            profile,
            progress: None,
        }
    }

    fn remote_request(&self, profile: DeviceProfile) -> LoadRequest {
        LoadRequest {
            location: ArtifactLocation::Remote {
                model_id: self.remote_id.clone(),
                cache_dir: self.cache_dir.clone(),
            },
            profile,
            progress: Some(self.progress.clone()),
        }
    }

    /// Resolve the tokenizer artifact.
    pub async fn resolve_tokenizer(
        &self,
        profile: DeviceProfile,
    ) -> EngineResult<Arc<dyn ChatTokenizer>> {
        match self.provider.load_tokenizer(&self.local_request(profile)).await {
            Ok(tokenizer) => {
                tracing::info!(path = %self.local_root.display(), "Tokenizer loaded from local files");
                return Ok(tokenizer);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Local tokenizer not found, falling back to remote"
                );
            }
        }

        self.provider
            .load_tokenizer(&self.remote_request(profile))
            .await
            .map(|tokenizer| {
                tracing::info!(model_id = %self.remote_id, "Tokenizer loaded from remote source");
                tokenizer
            })
            .map_err(|cause| EngineError::Resolution {
                kind: ArtifactKind::Tokenizer,
                cause,
            })
    }

    /// Resolve the model artifact for the profile-selected precision.
    pub async fn resolve_model(&self, profile: DeviceProfile) -> EngineResult<ResolvedModel> {
        match self.provider.load_model(&self.local_request(profile)).await {
            Ok(model) => {
                tracing::info!(path = %self.local_root.display(), "Model loaded from local files");
                return Ok(ResolvedModel {
                    model,
                    metadata: metadata::parse_model_config(&self.local_root),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Local model not found, falling back to remote");
            }
        }

        let model = self
            .provider
            .load_model(&self.remote_request(profile))
            .await
            .map_err(|cause| EngineError::Resolution {
                kind: ArtifactKind::Model,
                cause,
            })?;

        tracing::info!(model_id = %self.remote_id, "Model loaded from remote source");

        let cache_root = self
            .cache_dir
            .clone()
            .unwrap_or_else(cache::default_cache_dir);
        let metadata = cache::snapshot_path(&cache_root, &self.remote_id)
            .and_then(|snapshot| metadata::parse_model_config(&snapshot));

        Ok(ResolvedModel { model, metadata })
    }
}
