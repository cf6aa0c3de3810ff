//! Loaded model session
//!
//! Owns the tokenizer and model handles after a successful resolve. Both
//! handles are set together at construction, never individually, and the
//! session is only marked warm after the warm-up inference succeeds.

use crate::artifacts::ModelMetadata;
use crate::device::DeviceProfile;
use crate::error::{EngineError, EngineResult};
use crate::provider::{CausalModel, ChatTokenizer, GenerationParams};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Input used for the throwaway warm-up inference.
const WARM_UP_INPUT: &str = "a";

/// A fully-resolved tokenizer/model pair.
pub struct ModelSession {
    tokenizer: Arc<dyn ChatTokenizer>,
    model: Arc<dyn CausalModel>,
    profile: DeviceProfile,
    metadata: Option<ModelMetadata>,
    warm: bool,
    loaded_at: DateTime<Utc>,
}

impl ModelSession {
    pub fn new(
        tokenizer: Arc<dyn ChatTokenizer>,
        model: Arc<dyn CausalModel>,
        profile: DeviceProfile,
        metadata: Option<ModelMetadata>,
    ) -> Self {
        Self {
            tokenizer,
            model,
            profile,
            metadata,
            warm: false,
            loaded_at: Utc::now(),
        }
    }

    /// Run a minimal single-token generation to force one-time kernel
    /// compilation. Expensive on first use, especially for GPU shader
    /// compilation. Any failure is fatal to the load attempt.
    pub async fn warm_up(&mut self) -> EngineResult<()> {
        let started = Instant::now();
        tracing::info!(backend = %self.profile.backend, "Starting model warm-up");

        let input_ids = self
            .tokenizer
            .encode(WARM_UP_INPUT)
            .map_err(EngineError::WarmUp)?;

        self.model
            .generate(&input_ids, &GenerationParams::warm_up(), None)
            .await
            .map_err(EngineError::WarmUp)?;

        self.warm = true;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model warm-up complete"
        );
        Ok(())
    }

    pub fn is_warm(&self) -> bool {
        self.warm
    }

    /// Clone out the shared handles so generation can run without holding
    /// the session slot.
    pub fn handles(&self) -> (Arc<dyn ChatTokenizer>, Arc<dyn CausalModel>) {
        (self.tokenizer.clone(), self.model.clone())
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
