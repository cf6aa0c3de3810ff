//! Muse Engine - Client-side causal LM lifecycle and generation
//!
//! A lightweight Rust library that probes device capabilities, resolves model
//! artifacts locally-first with remote fallback, warms the model up, and
//! serves buffered or token-streamed chat generation behind an observable
//! lifecycle state.

pub mod artifacts;
pub mod chat;
pub mod config;
pub mod device;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod session;

pub use chat::{ChatMlTemplate, ChatTemplate, Conversation, Message, Role};
pub use config::EngineConfig;
pub use device::{Backend, CapabilityProbe, DeviceProfile, Precision, SystemProbe};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{LifecycleState, LoadStage};
pub use orchestrator::{GenerateOptions, Orchestrator, TokenCallback};
pub use progress::{ArtifactKind, ProgressEvent, ProgressPhase, ProgressSink};
pub use provider::{
    CausalModel, ChatTokenizer, GenerationParams, HubProvider, LoadRequest, ModelProvider,
};
pub use session::ModelSession;
