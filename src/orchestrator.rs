//! Generation orchestrator
//!
//! The public contract over the model session: serialized lazy
//! initialization, chat-style prompt templating, and buffered or
//! token-streamed generation. Load attempts are idempotent and safe to issue
//! from concurrent call sites; the guard is the populated session slot, so
//! overlapping calls converge on at most one real load.

use crate::artifacts::ArtifactResolver;
use crate::chat::Conversation;
use crate::config::EngineConfig;
use crate::device::{CapabilityProbe, DeviceProfile, SystemProbe};
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::{LifecycleState, LoadStage};
use crate::metrics;
use crate::progress::ProgressSink;
use crate::provider::{
    CausalModel, ChatTokenizer, GenerationParams, ModelProvider, TokenSink,
};
use crate::session::ModelSession;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, watch};

/// Callback receiving decoded text fragments during streaming generation.
pub type TokenCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-call generation options. All fields have caller-visible defaults.
#[derive(Clone)]
pub struct GenerateOptions {
    /// System instruction for the two-message exchange
    pub system_prompt: String,
    /// Maximum new tokens to generate (default 100)
    pub max_tokens: u32,
    /// Sampling temperature in [0, 2] (default 0.7)
    pub temperature: f32,
    /// Nucleus sampling mass in (0, 1] (default 0.9)
    pub top_p: f32,
    /// Top-k cutoff, > 0 (default 10)
    pub top_k: u32,
    /// Stream tokens through `on_token` as they are produced
    pub stream: bool,
    /// Per-token text callback; required for streaming to take effect
    pub on_token: Option<TokenCallback>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful AI assistant.".to_string(),
            max_tokens: 100,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 10,
            stream: false,
            on_token: None,
        }
    }
}

impl std::fmt::Debug for GenerateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateOptions")
            .field("system_prompt", &self.system_prompt)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("stream", &self.stream)
            .field("on_token", &self.on_token.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl GenerateOptions {
    /// Validate option ranges before any compute runs.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_tokens == 0 {
            return Err(EngineError::InvalidOptions(
                "max_tokens must be > 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(EngineError::InvalidOptions(format!(
                "temperature must be in [0, 2] (got {})",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(EngineError::InvalidOptions(format!(
                "top_p must be in (0, 1] (got {})",
                self.top_p
            )));
        }
        if self.top_k == 0 {
            return Err(EngineError::InvalidOptions(
                "top_k must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Engine parameters, passed through verbatim plus the fixed mild
    /// repetition penalty.
    fn params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.max_tokens,
            do_sample: true,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            repetition_penalty: 1.1,
        }
    }
}

/// Model lifecycle and generation orchestrator.
///
/// One instance per embedding context, constructed explicitly; there is no
/// implicit global singleton. The session lives until the orchestrator is
/// dropped.
pub struct Orchestrator {
    config: EngineConfig,
    probe: Arc<dyn CapabilityProbe>,
    provider: Arc<dyn ModelProvider>,
    /// Slot guarded so only one load pipeline runs at a time
    session: Mutex<Option<ModelSession>>,
    state_tx: watch::Sender<LifecycleState>,
}

impl Orchestrator {
    /// Create an orchestrator with the production capability probe.
    pub fn new(config: EngineConfig, provider: Arc<dyn ModelProvider>) -> Self {
        Self::with_probe(config, provider, Arc::new(SystemProbe::new()))
    }

    /// Create an orchestrator with an injected capability probe.
    pub fn with_probe(
        config: EngineConfig,
        provider: Arc<dyn ModelProvider>,
        probe: Arc<dyn CapabilityProbe>,
    ) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::default());
        Self {
            config,
            probe,
            provider,
            session: Mutex::new(None),
            state_tx,
        }
    }

    /// Snapshot of the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to lifecycle state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Metadata of the loaded model, if a session exists.
    pub async fn model_metadata(&self) -> Option<crate::artifacts::ModelMetadata> {
        self.session
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.metadata().cloned())
    }

    /// Load tokenizer and model, warm up, and mark the engine ready.
    ///
    /// Idempotent: a no-op when a session is already populated, so it is safe
    /// to call on mount and from overlapping call sites. A failed attempt
    /// leaves the slot empty; calling again restarts the full pipeline,
    /// including a fresh capability probe.
    pub async fn load_model(&self) -> EngineResult<()> {
        self.ensure_loaded().await.map(|_| ())
    }

    /// Generate a completion for `prompt`.
    ///
    /// Lazily loads the model first if needed. In streaming mode (both
    /// `stream = true` and `on_token` present) the callback observes decoded
    /// fragments of generated tokens only, with special tokens and the echoed
    /// prompt suppressed, and the returned string equals the concatenation of
    /// all callback payloads. Otherwise the full output is decoded once
    /// generation completes and only the continuation past the input sequence
    /// is returned.
    pub async fn generate(&self, prompt: &str, options: GenerateOptions) -> EngineResult<String> {
        options.validate()?;

        let (tokenizer, model) = self
            .ensure_loaded()
            .await
            .map_err(|e| EngineError::ModelUnavailable(e.to_string()))?;

        let conversation = Conversation::exchange(&options.system_prompt, prompt);
        let input_ids = tokenizer
            .apply_chat_template(&conversation)
            .map_err(EngineError::Generation)?;
        let params = options.params();

        tracing::debug!(
            input_tokens = input_ids.len(),
            max_new_tokens = params.max_new_tokens,
            stream = options.stream,
            "Starting generation"
        );

        let result = match (options.stream, options.on_token.clone()) {
            (true, Some(callback)) => {
                self.generate_streaming(&tokenizer, &model, &input_ids, &params, callback)
                    .await
            }
            _ => {
                self.generate_buffered(&tokenizer, &model, &input_ids, &params)
                    .await
            }
        };

        if result.is_err() {
            metrics::record_generation_failed();
        }
        result
    }

    /// Populate the session slot if empty, returning shared handles.
    ///
    /// Holding the slot lock for the whole pipeline serializes overlapping
    /// load attempts; late arrivals observe the populated slot and return
    /// immediately without touching the resolver.
    async fn ensure_loaded(
        &self,
    ) -> EngineResult<(Arc<dyn ChatTokenizer>, Arc<dyn CausalModel>)> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            return Ok(session.handles());
        }

        metrics::record_load_started();
        let started = Instant::now();

        match self.run_load_pipeline().await {
            Ok(session) => {
                let handles = session.handles();
                let backend = session.profile().backend;
                *slot = Some(session);

                self.update(|s| {
                    s.is_loading = false;
                    s.model_loaded = true;
                    s.stage = LoadStage::Ready;
                    s.progress = None;
                    s.error = None;
                });
                metrics::record_load_completed(backend, started.elapsed().as_secs_f64());
                tracing::info!(
                    backend = %backend,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Model ready"
                );
                Ok(handles)
            }
            Err(e) => {
                let message = e.to_string();
                self.update(|s| {
                    s.is_loading = false;
                    s.model_loaded = false;
                    s.stage = LoadStage::Errored;
                    s.progress = None;
                    s.error = Some(message.clone());
                });
                metrics::record_load_failed();
                tracing::error!(error = %message, "Model load failed");
                Err(e)
            }
        }
    }

    /// Probe -> resolve(tokenizer) -> resolve(model) -> warm-up, in order.
    async fn run_load_pipeline(&self) -> EngineResult<ModelSession> {
        self.update(|s| *s = LifecycleState::loading());

        // Probed fresh on every attempt so a changed environment is honored
        let profile = match self.config.force_backend {
            Some(backend) => {
                tracing::info!(backend = %backend, "Backend pinned by configuration");
                DeviceProfile::for_backend(backend)
            }
            None => self.probe.probe(),
        };
        self.update(|s| s.backend = Some(profile.backend));

        let resolver = ArtifactResolver::new(
            self.provider.clone(),
            self.config.local_model_dir.clone(),
            self.config.model_id.clone(),
            self.config.cache_dir.clone(),
            self.progress_sink(),
        );

        self.update(|s| s.stage = LoadStage::ResolvingTokenizer);
        let tokenizer = resolver.resolve_tokenizer(profile).await?;

        self.update(|s| s.stage = LoadStage::ResolvingModel);
        let resolved = resolver.resolve_model(profile).await?;

        if let Some(meta) = &resolved.metadata {
            tracing::info!(
                model_type = ?meta.model_type,
                vocab_size = ?meta.vocab_size,
                context_len = ?meta.max_position_embeddings,
                "Model metadata"
            );
        }

        self.update(|s| s.stage = LoadStage::WarmingUp);
        let mut session = ModelSession::new(tokenizer, resolved.model, profile, resolved.metadata);
        session.warm_up().await?;

        Ok(session)
    }

    /// Sink that folds typed progress events into the observable state.
    fn progress_sink(&self) -> ProgressSink {
        let tx = self.state_tx.clone();
        Arc::new(move |event| {
            tx.send_modify(|s| s.progress = Some(event));
        })
    }

    async fn generate_buffered(
        &self,
        tokenizer: &Arc<dyn ChatTokenizer>,
        model: &Arc<dyn CausalModel>,
        input_ids: &[u32],
        params: &GenerationParams,
    ) -> EngineResult<String> {
        let started = Instant::now();
        let output_ids = model
            .generate(input_ids, params, None)
            .await
            .map_err(EngineError::Generation)?;

        let full_text = tokenizer
            .decode(&output_ids, true)
            .map_err(EngineError::Generation)?;

        // The engine returns [input_ids] + [continuation]; decode only the
        // tokens past the input length to drop the echoed prompt.
        let continuation = if output_ids.len() > input_ids.len() {
            tokenizer
                .decode(&output_ids[input_ids.len()..], true)
                .map_err(EngineError::Generation)?
        } else {
            String::new()
        };

        metrics::record_generation(
            output_ids.len().saturating_sub(input_ids.len()) as u64,
            started.elapsed().as_secs_f64(),
        );

        let trimmed = continuation.trim();
        if trimmed.is_empty() {
            // Documented fallback: never return empty when anything decoded
            Ok(full_text)
        } else {
            Ok(trimmed.to_string())
        }
    }

    async fn generate_streaming(
        &self,
        tokenizer: &Arc<dyn ChatTokenizer>,
        model: &Arc<dyn CausalModel>,
        input_ids: &[u32],
        params: &GenerationParams,
        callback: TokenCallback,
    ) -> EngineResult<String> {
        let started = Instant::now();
        let accumulated = Arc::new(std::sync::Mutex::new(String::new()));

        let sink_accumulated = accumulated.clone();
        let sink_tokenizer = tokenizer.clone();
        let sink: Box<TokenSink> = Box::new(move |id: u32| {
            // Special tokens decode to empty text and are suppressed; the
            // engine only forwards generated ids, so the prompt never echoes.
            match sink_tokenizer.decode(&[id], true) {
                Ok(text) if !text.is_empty() => {
                    if let Ok(mut buffer) = sink_accumulated.lock() {
                        buffer.push_str(&text);
                    }
                    callback(&text);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(token = id, error = %e, "Failed to decode streamed token");
                }
            }
        });

        let output_ids = model
            .generate(input_ids, params, Some(&*sink))
            .await
            .map_err(EngineError::Generation)?;

        metrics::record_generation(
            output_ids.len().saturating_sub(input_ids.len()) as u64,
            started.elapsed().as_secs_f64(),
        );

        let output = accumulated
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default();
        Ok(output)
    }

    fn update(&self, f: impl FnOnce(&mut LifecycleState)) {
        self.state_tx.send_modify(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = GenerateOptions::default();
        assert_eq!(options.system_prompt, "You are a helpful AI assistant.");
        assert_eq!(options.max_tokens, 100);
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.top_p, 0.9);
        assert_eq!(options.top_k, 10);
        assert!(!options.stream);
        assert!(options.on_token.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let options = GenerateOptions {
            max_tokens: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_temperature_bounds() {
        let mut options = GenerateOptions {
            temperature: 2.0,
            ..Default::default()
        };
        assert!(options.validate().is_ok());

        options.temperature = 2.1;
        assert!(options.validate().is_err());

        options.temperature = -0.1;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_top_p_bounds() {
        let mut options = GenerateOptions {
            top_p: 1.0,
            ..Default::default()
        };
        assert!(options.validate().is_ok());

        options.top_p = 0.0;
        assert!(options.validate().is_err());

        options.top_p = 1.5;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_params_carry_fixed_repetition_penalty() {
        let options = GenerateOptions::default();
        let params = options.params();
        assert_eq!(params.repetition_penalty, 1.1);
        assert!(params.do_sample);
        assert_eq!(params.max_new_tokens, 100);
    }

    #[test]
    fn test_options_debug_hides_callback_body() {
        let options = GenerateOptions {
            on_token: Some(Arc::new(|_| {})),
            ..Default::default()
        };
        let debug = format!("{options:?}");
        assert!(debug.contains("<callback>"));
    }
}
