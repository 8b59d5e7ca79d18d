use std::path::Path;

use crate::quilt_pipeline::common::error::Result;
use crate::quilt_pipeline::image_store::types::{FloatImage, ViewImage};

pub trait ArtifactWriter {
    /// Stores an RGBA8 buffer as a 4-channel 8-bit PNG.
    fn write_quilt(&self, path: &Path, image: &ViewImage) -> Result<()>;
    /// Stores a single-channel float buffer as a Radiance HDR image.
    fn write_native(&self, path: &Path, image: &FloatImage) -> Result<()>;
}
