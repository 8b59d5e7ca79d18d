use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::quilt_pipeline::common::error::{QuiltError, Result};
use crate::quilt_pipeline::device::cpu_device::CpuDevice;
#[cfg(feature = "cuda")]
use crate::quilt_pipeline::device::cuda_device::CudaDevice;

/// Which compute backend the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// CUDA when available, otherwise the CPU device
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl FromStr for BackendPreference {
    type Err = QuiltError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(QuiltError::ArgumentError(format!(
                "unknown backend `{other}` (expected auto, cpu or cuda)"
            ))),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendPreference::Auto => write!(f, "auto"),
            BackendPreference::Cpu => write!(f, "cpu"),
            BackendPreference::Cuda => write!(f, "cuda"),
        }
    }
}

/// The device a run will use
pub enum SelectedDevice {
    Cpu(CpuDevice),
    #[cfg(feature = "cuda")]
    Cuda(CudaDevice),
}

#[cfg(feature = "cuda")]
fn open_cuda(ordinal: usize) -> Result<CudaDevice> {
    CudaDevice::new(ordinal)
}

#[cfg(not(feature = "cuda"))]
fn open_cuda(_ordinal: usize) -> Result<std::convert::Infallible> {
    Err(QuiltError::DeviceUnavailable(
        "this build does not include the `cuda` feature".to_string(),
    ))
}

/// Opens the device for `preference`; `Auto` falls back to the CPU device.
pub fn select_device(preference: BackendPreference, ordinal: usize) -> Result<SelectedDevice> {
    let selected = match preference {
        BackendPreference::Cpu => SelectedDevice::Cpu(CpuDevice::new()),
        #[cfg(feature = "cuda")]
        BackendPreference::Cuda => SelectedDevice::Cuda(open_cuda(ordinal)?),
        #[cfg(not(feature = "cuda"))]
        BackendPreference::Cuda => match open_cuda(ordinal)? {},
        BackendPreference::Auto => match open_cuda(ordinal) {
            #[cfg(feature = "cuda")]
            Ok(device) => SelectedDevice::Cuda(device),
            #[cfg(not(feature = "cuda"))]
            Ok(never) => match never {},
            Err(e) => {
                warn!("{e}; falling back to the CPU device");
                SelectedDevice::Cpu(CpuDevice::new())
            }
        },
    };
    info!("Using {} backend", selected.label());
    Ok(selected)
}

impl SelectedDevice {
    pub fn label(&self) -> &'static str {
        match self {
            SelectedDevice::Cpu(_) => "cpu",
            #[cfg(feature = "cuda")]
            SelectedDevice::Cuda(_) => "cuda",
        }
    }
}
