//! Common utilities module
//!
//! This module contains the error type and stage timing shared across the quilt pipeline.

pub mod error;
pub mod timing;

pub use error::{QuiltError, Result};
pub use timing::{PipelineTimings, StepTiming, Timer};
