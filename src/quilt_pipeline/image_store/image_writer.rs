use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb32FImage, RgbaImage};
use tracing::debug;

use crate::quilt_pipeline::common::error::{QuiltError, Result};
use crate::quilt_pipeline::image_store::types::{FloatImage, ViewImage};
use crate::quilt_pipeline::image_store::writer::ArtifactWriter;

pub struct ImageCrateWriter;

fn encode_error(path: &Path, reason: impl ToString) -> QuiltError {
    QuiltError::EncodeError {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

impl ArtifactWriter for ImageCrateWriter {
    fn write_quilt(&self, path: &Path, image: &ViewImage) -> Result<()> {
        debug!("Encoding PNG {}x{} to {}", image.width, image.height, path.display());

        let buffer = RgbaImage::from_raw(image.width, image.height, image.data.clone())
            .ok_or_else(|| {
                encode_error(
                    path,
                    format!(
                        "buffer of {} bytes does not match {}x{} RGBA",
                        image.data.len(),
                        image.width,
                        image.height
                    ),
                )
            })?;

        buffer
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| encode_error(path, e))
    }

    fn write_native(&self, path: &Path, image: &FloatImage) -> Result<()> {
        debug!("Encoding HDR {}x{} to {}", image.width, image.height, path.display());

        // Radiance HDR has no single-channel layout; gray is stored as r = g = b.
        let rgb: Vec<f32> = image.data.iter().flat_map(|&v| [v, v, v]).collect();
        let buffer = Rgb32FImage::from_raw(image.width, image.height, rgb).ok_or_else(|| {
            encode_error(
                path,
                format!(
                    "buffer of {} floats does not match {}x{}",
                    image.data.len(),
                    image.width,
                    image.height
                ),
            )
        })?;

        DynamicImage::ImageRgb32F(buffer)
            .save_with_format(path, ImageFormat::Hdr)
            .map_err(|e| encode_error(path, e))
    }
}
