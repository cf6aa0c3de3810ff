//! Typed progress events emitted during artifact resolution
//!
//! Resolution reports progress through an explicit callback interface rather
//! than mutating a shared string. The human-readable form is derived at the
//! consumer boundary via `Display`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which artifact a resolution step concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Tokenizer,
    Model,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tokenizer => write!(f, "tokenizer"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// Phase of a resolution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    /// A download is about to start
    Initiate,
    /// Bytes are being fetched from the remote source
    Downloading,
    /// A fetched file is being parsed/loaded
    Loading,
    /// The file is present in the persistent cache
    Cached,
}

/// One transient progress observation during artifact resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub artifact: ArtifactKind,
    /// File within the artifact set this event concerns
    pub file: String,
    /// Overall completion for this artifact, 0..=100
    pub percent: u8,
}

impl ProgressEvent {
    pub fn new(phase: ProgressPhase, artifact: ArtifactKind, file: &str, percent: u8) -> Self {
        Self {
            phase,
            artifact,
            file: file.to_string(),
            percent: percent.min(100),
        }
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.phase {
            ProgressPhase::Initiate => {
                write!(f, "Starting download: {} ({})", self.file, self.artifact)
            }
            ProgressPhase::Downloading => {
                write!(
                    f,
                    "Downloading {}: {} - {}%",
                    self.artifact, self.file, self.percent
                )
            }
            ProgressPhase::Loading => {
                write!(f, "Loading {}: {} - {}%", self.artifact, self.file, self.percent)
            }
            ProgressPhase::Cached => {
                write!(f, "Cached for offline use: {}", self.file)
            }
        }
    }
}

/// Callback through which resolution publishes progress events.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A sink that drops every event.
pub fn null_sink() -> ProgressSink {
    Arc::new(|_| {})
}
