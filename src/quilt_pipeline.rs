//! Quilt to native image pipeline
//!
//! This module turns a light-field quilt into the interleaved image of a
//! lenticular display, with separate modules for image I/O, quilt geometry,
//! compute devices, and conversion orchestration.

pub mod common;
pub mod image_store;
pub mod layout;
pub mod device;
pub mod conversions;

pub use common::{
    QuiltError,
    Result,
    PipelineTimings,
};

pub use image_store::{
    ViewImage,
    FloatImage,
    ViewReader,
    ImageCrateReader,
    ArtifactWriter,
    ImageCrateWriter,
};

pub use layout::{
    QuiltGrid,
    QuiltLayout,
    InputMode,
    placement_for,
};

pub use device::{
    ComputeDevice,
    CpuDevice,
    BackendPreference,
    SelectedDevice,
    select_device,
};

#[cfg(feature = "cuda")]
pub use device::CudaDevice;

pub use conversions::{
    ConversionConfig,
    ConversionConfigBuilder,
    ConversionReport,
    ConversionState,
    QuiltToNativePipeline,
};
