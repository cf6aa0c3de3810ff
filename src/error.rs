//! Error types for the engine surface

use crate::progress::ArtifactKind;
use thiserror::Error;

/// Errors surfaced by the orchestrator and its components.
///
/// Lower-level fetch/parse failures are carried as `anyhow::Error` causes;
/// they are caught only at the local-to-remote fallback boundary and at the
/// top-level load/generate boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Remote artifact resolution failed after the local tier was exhausted.
    /// Terminal for the load attempt.
    #[error("failed to resolve {kind} artifact: {cause}")]
    Resolution {
        kind: ArtifactKind,
        cause: anyhow::Error,
    },

    /// The mandatory warm-up inference failed. Fatal to the load attempt.
    #[error("model warm-up failed: {0}")]
    WarmUp(anyhow::Error),

    /// Generation on an established session failed. The session stays usable.
    #[error("generation failed: {0}")]
    Generation(anyhow::Error),

    /// Caller-supplied generation options were out of range.
    #[error("invalid generation options: {0}")]
    InvalidOptions(String),

    /// `generate` was called, lazy loading ran, and the model still is not
    /// available.
    #[error("model failed to load: {0}")]
    ModelUnavailable(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether the error invalidates the current load attempt (as opposed to
    /// a single generate call).
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::Resolution { .. } | Self::WarmUp(_) | Self::ModelUnavailable(_)
        )
    }
}
