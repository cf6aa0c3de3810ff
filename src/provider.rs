//! Tokenizer/model provider contract
//!
//! The engine consumes tokenizer and model handles through the traits here.
//! `HubProvider` is the production implementation: it loads real tokenizers
//! via the `tokenizers` crate from either a bundled directory or the
//! HuggingFace Hub, and delegates model construction to an injected
//! `ModelBackend` (the compute collaborator, e.g. an ONNX or candle runtime).

use crate::artifacts::hub;
use crate::chat::{ChatMlTemplate, ChatTemplate, Conversation};
use crate::device::DeviceProfile;
use crate::progress::{ArtifactKind, ProgressEvent, ProgressPhase, ProgressSink};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokenizers::Tokenizer;

/// Sampling parameters passed through to the underlying engine verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub do_sample: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            do_sample: true,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 10,
            repetition_penalty: 1.1,
        }
    }
}

impl GenerationParams {
    /// Parameters for the single-token greedy warm-up call.
    pub fn warm_up() -> Self {
        Self {
            max_new_tokens: 1,
            do_sample: false,
            ..Default::default()
        }
    }
}

/// Per-token observer installed during streaming generation.
///
/// Implementations receive only *generated* token ids; the echoed prompt is
/// never forwarded.
pub type TokenSink = dyn Fn(u32) + Send + Sync;

/// Tokenizer handle with chat-template support.
pub trait ChatTokenizer: Send + Sync {
    /// Encode plain text to token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids to text, optionally stripping special tokens.
    fn decode(&self, ids: &[u32], skip_special: bool) -> Result<String>;

    /// Format a conversation into the token sequence the model expects,
    /// including the trailing generation prompt.
    fn apply_chat_template(&self, conversation: &Conversation) -> Result<Vec<u32>>;
}

/// Loaded causal language model handle.
#[async_trait]
pub trait CausalModel: Send + Sync {
    /// Run generation to completion, returning the full sequence (prompt
    /// followed by the continuation). When `on_token` is present it is
    /// invoked once per generated token id as it is produced.
    async fn generate(
        &self,
        input_ids: &[u32],
        params: &GenerationParams,
        on_token: Option<&TokenSink>,
    ) -> Result<Vec<u32>>;
}

/// Where an artifact load should read from.
#[derive(Debug, Clone)]
pub enum ArtifactLocation {
    /// Pre-bundled directory; remote fetching is disabled for this attempt.
    Local(PathBuf),
    /// Canonical remote source identifier, fetched through the persistent
    /// cache.
    Remote {
        model_id: String,
        cache_dir: Option<PathBuf>,
    },
}

/// One artifact load attempt.
#[derive(Clone)]
pub struct LoadRequest {
    pub location: ArtifactLocation,
    pub profile: DeviceProfile,
    pub progress: Option<ProgressSink>,
}

impl LoadRequest {
    fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = &self.progress {
            sink(event);
        }
    }
}

/// Provider of tokenizer and model handles.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn load_tokenizer(&self, request: &LoadRequest) -> Result<Arc<dyn ChatTokenizer>>;
    async fn load_model(&self, request: &LoadRequest) -> Result<Arc<dyn CausalModel>>;
}

/// Resolved file set for one model load, handed to the compute backend.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub config: PathBuf,
    pub weights: PathBuf,
    pub generation_config: Option<PathBuf>,
}

/// Compute collaborator that turns resolved files into a runnable model.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn build(
        &self,
        artifacts: &ModelArtifacts,
        profile: &DeviceProfile,
    ) -> Result<Arc<dyn CausalModel>>;
}

/// HuggingFace tokenizer wrapped with a chat template.
pub struct HfTokenizer {
    inner: Tokenizer,
    template: Arc<dyn ChatTemplate>,
}

impl HfTokenizer {
    pub fn new(inner: Tokenizer, template: Arc<dyn ChatTemplate>) -> Self {
        Self { inner, template }
    }

    /// Load from a `tokenizer.json` file.
    pub fn from_file(path: &PathBuf, template: Arc<dyn ChatTemplate>) -> Result<Self> {
        let inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", path.display()))?;
        Ok(Self::new(inner, template))
    }
}

impl ChatTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow!("tokenizer encode error: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32], skip_special: bool) -> Result<String> {
        self.inner
            .decode(ids, skip_special)
            .map_err(|e| anyhow!("tokenizer decode error: {e}"))
    }

    fn apply_chat_template(&self, conversation: &Conversation) -> Result<Vec<u32>> {
        let prompt = self.template.apply(conversation);
        self.encode(&prompt)
    }
}

/// Production provider: bundled directory or HuggingFace Hub.
pub struct HubProvider {
    backend: Arc<dyn ModelBackend>,
    template: Arc<dyn ChatTemplate>,
}

impl HubProvider {
    /// Create a provider with the default ChatML template.
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            template: Arc::new(ChatMlTemplate::new()),
        }
    }

    /// Create a provider with a custom chat template.
    pub fn with_template(backend: Arc<dyn ModelBackend>, template: Arc<dyn ChatTemplate>) -> Self {
        Self { backend, template }
    }
}

#[async_trait]
impl ModelProvider for HubProvider {
    async fn load_tokenizer(&self, request: &LoadRequest) -> Result<Arc<dyn ChatTokenizer>> {
        let path = match &request.location {
            ArtifactLocation::Local(dir) => {
                let path = dir.join("tokenizer.json");
                if !path.exists() {
                    anyhow::bail!("no bundled tokenizer at {}", path.display());
                }
                path
            }
            ArtifactLocation::Remote {
                model_id,
                cache_dir,
            } => {
                hub::fetch_tokenizer(
                    model_id,
                    cache_dir.clone(),
                    request.progress.clone(),
                )
                .await
                .with_context(|| format!("failed to fetch tokenizer for {model_id}"))?
            }
        };

        request.emit(ProgressEvent::new(
            ProgressPhase::Loading,
            ArtifactKind::Tokenizer,
            "tokenizer.json",
            100,
        ));

        let tokenizer = HfTokenizer::from_file(&path, self.template.clone())?;
        Ok(Arc::new(tokenizer))
    }

    async fn load_model(&self, request: &LoadRequest) -> Result<Arc<dyn CausalModel>> {
        let artifacts = match &request.location {
            ArtifactLocation::Local(dir) => {
                let config = dir.join("config.json");
                let weights = dir.join(request.profile.precision.weight_file());
                if !config.exists() {
                    anyhow::bail!("no bundled model config at {}", config.display());
                }
                if !weights.exists() {
                    anyhow::bail!("no bundled weights at {}", weights.display());
                }
                let generation_config = dir.join("generation_config.json");
                ModelArtifacts {
                    config,
                    weights,
                    generation_config: generation_config.exists().then_some(generation_config),
                }
            }
            ArtifactLocation::Remote {
                model_id,
                cache_dir,
            } => {
                hub::fetch_model(
                    model_id,
                    cache_dir.clone(),
                    request.profile.precision,
                    request.progress.clone(),
                )
                .await
                .with_context(|| format!("failed to fetch model for {model_id}"))?
            }
        };

        request.emit(ProgressEvent::new(
            ProgressPhase::Loading,
            ArtifactKind::Model,
            request.profile.precision.weight_file(),
            100,
        ));

        self.backend
            .build(&artifacts, &request.profile)
            .await
            .context("model backend failed to build from resolved artifacts")
    }
}
