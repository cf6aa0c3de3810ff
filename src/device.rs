//! Device capability probing
//!
//! Picks an execution backend and numeric precision for the current machine.
//! Detection runs fresh on every load attempt so a changed environment
//! (e.g. a GPU driver that became available) is honored on retry.

use serde::{Deserialize, Serialize};
use std::process::Command;

/// Compute execution target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// GPU-accelerated execution
    GpuAccelerated,
    /// Portable software fallback, compatible with all devices
    PortableFallback,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GpuAccelerated => write!(f, "gpu"),
            Self::PortableFallback => write!(f, "portable"),
        }
    }
}

/// Numeric precision of the weight variant to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// 4-bit weights with fp16 activations (GPU variant)
    Q4F16,
    /// 4-bit integer weights (portable variant)
    Q4,
}

impl Precision {
    /// File name of the quantized weight variant inside a model repo.
    pub fn weight_file(&self) -> &'static str {
        match self {
            Self::Q4F16 => "onnx/model_q4f16.onnx",
            Self::Q4 => "onnx/model_q4.onnx",
        }
    }

    /// Short dtype tag as it appears in repo file names.
    pub fn dtype(&self) -> &'static str {
        match self {
            Self::Q4F16 => "q4f16",
            Self::Q4 => "q4",
        }
    }
}

/// Backend plus precision chosen for one load attempt.
///
/// Immutable once computed; determines which weight variant is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub backend: Backend,
    pub precision: Precision,
}

impl DeviceProfile {
    /// The canonical profile for a given backend.
    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::GpuAccelerated => Self {
                backend,
                precision: Precision::Q4F16,
            },
            Backend::PortableFallback => Self {
                backend,
                precision: Precision::Q4,
            },
        }
    }
}

/// Probes the runtime environment for compute capability.
///
/// Implementations must be side-effect free beyond reading environment
/// feature flags. Injectable so tests can pin the outcome.
pub trait CapabilityProbe: Send + Sync {
    fn probe(&self) -> DeviceProfile;
}

/// Production probe backed by `nvidia-smi`.
///
/// In multi-tenant environments the process may see device files for GPUs it
/// cannot use; `nvidia-smi` reports only the GPUs actually allocated.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    command: String,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe {
    pub fn new() -> Self {
        Self::with_command("nvidia-smi")
    }

    /// Probe using an alternate detection command.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn gpu_available(&self) -> bool {
        let output = Command::new(&self.command)
            .args(["--query-gpu=index", "--format=csv,noheader"])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let count = stdout
                    .lines()
                    .filter(|line| line.trim().parse::<u32>().is_ok())
                    .count();
                count > 0
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!(stderr = %stderr, "nvidia-smi failed, assuming no GPU");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "Failed to run nvidia-smi, assuming no GPU");
                false
            }
        }
    }
}

impl CapabilityProbe for SystemProbe {
    fn probe(&self) -> DeviceProfile {
        let profile = if self.gpu_available() {
            DeviceProfile::for_backend(Backend::GpuAccelerated)
        } else {
            DeviceProfile::for_backend(Backend::PortableFallback)
        };

        tracing::info!(
            backend = %profile.backend,
            dtype = %profile.precision.dtype(),
            "Device capability probe complete"
        );

        profile
    }
}

/// Probe that always reports a fixed profile.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    profile: DeviceProfile,
}

impl FixedProbe {
    pub fn new(backend: Backend) -> Self {
        Self {
            profile: DeviceProfile::for_backend(backend),
        }
    }
}

impl CapabilityProbe for FixedProbe {
    fn probe(&self) -> DeviceProfile {
        self.profile
    }
}
