//! Pipeline conversions module
//!
//! This module contains the orchestration of a quilt to native conversion.

mod quilt_to_native;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use quilt_to_native::QuiltToNativePipeline;
pub use state::{ConversionState, StateTracker};
pub use types::{
    ConversionConfig, ConversionConfigBuilder, ConversionReport, DEFAULT_NATIVE_FILE_NAME,
    DEFAULT_QUILT_FILE_NAME,
};
