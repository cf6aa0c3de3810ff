//! Observable lifecycle state
//!
//! One mutable instance per orchestrator, published through a watch channel.
//! Transitions are monotonic within a load cycle (idle -> loading ->
//! ready | errored); `error` and `model_loaded` are never set together.

use crate::device::Backend;
use crate::progress::ProgressEvent;
use serde::{Deserialize, Serialize};

/// Where the orchestrator is in its load state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    /// No load attempted yet
    Uninitialized,
    /// Probing device capabilities
    Probing,
    /// Resolving the tokenizer artifact
    ResolvingTokenizer,
    /// Resolving the model artifact
    ResolvingModel,
    /// Running the mandatory warm-up inference
    WarmingUp,
    /// Session populated and warm
    Ready,
    /// The last load attempt failed
    Errored,
}

impl LoadStage {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            Self::Probing | Self::ResolvingTokenizer | Self::ResolvingModel | Self::WarmingUp
        )
    }
}

/// Snapshot of the orchestrator's observable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleState {
    pub is_loading: bool,
    pub model_loaded: bool,
    pub stage: LoadStage,
    /// Backend chosen by the most recent probe, once known
    pub backend: Option<Backend>,
    /// Most recent artifact progress observation
    pub progress: Option<ProgressEvent>,
    pub error: Option<String>,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            is_loading: false,
            model_loaded: false,
            stage: LoadStage::Uninitialized,
            backend: None,
            progress: None,
            error: None,
        }
    }
}

impl LifecycleState {
    /// Fresh state for the start of a load cycle.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            stage: LoadStage::Probing,
            ..Default::default()
        }
    }

    /// Human-readable progress line, derived at the consumer boundary.
    pub fn describe(&self) -> String {
        match self.stage {
            LoadStage::Uninitialized => String::new(),
            LoadStage::Probing => "Initializing... Checking device capabilities.".to_string(),
            LoadStage::ResolvingTokenizer => self
                .progress
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "Loading tokenizer...".to_string()),
            LoadStage::ResolvingModel => self
                .progress
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "Loading model...".to_string()),
            LoadStage::WarmingUp => match self.backend {
                Some(Backend::GpuAccelerated) => {
                    "Compiling GPU kernels... This may take up to a minute.".to_string()
                }
                _ => "Initializing portable runtime...".to_string(),
            },
            LoadStage::Ready => match self.backend {
                Some(Backend::GpuAccelerated) => {
                    "Model loaded with GPU acceleration!".to_string()
                }
                _ => "Model loaded in portable mode.".to_string(),
            },
            LoadStage::Errored => self
                .error
                .clone()
                .unwrap_or_else(|| "Failed to load model".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ArtifactKind, ProgressPhase};

    #[test]
    fn test_default_state_is_idle() {
        let state = LifecycleState::default();
        assert!(!state.is_loading);
        assert!(!state.model_loaded);
        assert_eq!(state.stage, LoadStage::Uninitialized);
        assert!(state.error.is_none());
        assert_eq!(state.describe(), "");
    }

    #[test]
    fn test_loading_state() {
        let state = LifecycleState::loading();
        assert!(state.is_loading);
        assert!(!state.model_loaded);
        assert_eq!(state.stage, LoadStage::Probing);
        assert!(state.describe().contains("device capabilities"));
    }

    #[test]
    fn test_stage_loading_classification() {
        assert!(LoadStage::Probing.is_loading());
        assert!(LoadStage::ResolvingTokenizer.is_loading());
        assert!(LoadStage::ResolvingModel.is_loading());
        assert!(LoadStage::WarmingUp.is_loading());
        assert!(!LoadStage::Uninitialized.is_loading());
        assert!(!LoadStage::Ready.is_loading());
        assert!(!LoadStage::Errored.is_loading());
    }

    #[test]
    fn test_describe_prefers_progress_event() {
        let mut state = LifecycleState::loading();
        state.stage = LoadStage::ResolvingModel;
        state.progress = Some(ProgressEvent::new(
            ProgressPhase::Downloading,
            ArtifactKind::Model,
            "onnx/model_q4.onnx",
            50,
        ));
        assert!(state.describe().contains("50%"));

        state.progress = None;
        assert_eq!(state.describe(), "Loading model...");
    }

    #[test]
    fn test_describe_warm_up_per_backend() {
        let mut state = LifecycleState::loading();
        state.stage = LoadStage::WarmingUp;
        state.backend = Some(Backend::GpuAccelerated);
        assert!(state.describe().contains("Compiling GPU kernels"));

        state.backend = Some(Backend::PortableFallback);
        assert!(state.describe().contains("portable runtime"));
    }

    #[test]
    fn test_describe_errored_uses_error_message() {
        let mut state = LifecycleState::default();
        state.stage = LoadStage::Errored;
        state.error = Some("network unreachable".to_string());
        assert_eq!(state.describe(), "network unreachable");
    }
}
