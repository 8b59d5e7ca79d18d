//! Compute device module
//!
//! The capability trait the pipeline drives, a software device, and a CUDA
//! device when built with the `cuda` feature.

mod backend;
pub mod cpu_device;
#[cfg(feature = "cuda")]
pub mod cuda_device;
pub mod interleave;
mod selection;
pub mod types;

pub use backend::{ComputeDevice, DeviceTexture};
pub use cpu_device::{CpuDevice, CpuKernelHandle, CpuTexture};
#[cfg(feature = "cuda")]
pub use cuda_device::{CudaDevice, CudaKernel, CudaTexture};
pub use interleave::{CpuKernel, KernelInvocation, LenticularInterleave, INTERLEAVE_ENTRY};
pub use selection::{select_device, BackendPreference, SelectedDevice};
pub use types::{KernelSpec, Region, TexelBuffer, TextureAccess, TextureDescriptor, TextureFormat};
