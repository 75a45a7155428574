//! Shared per-task tunables (spec §4.7: "model_name, device, batch_size...").

use serde::{Deserialize, Serialize};

/// Compute device a stage task's backing model server should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CPU inference.
    Cpu,
    /// CUDA GPU inference.
    Cuda,
}

impl Default for Device {
    fn default() -> Self {
        Device::Cuda
    }
}
