//! View reader implementation using the `image` crate.
//!
//! Any format the crate was built with (PNG, JPEG, BMP, TIFF, HDR) is accepted.
//! The format is sniffed from the file contents, so views without an extension
//! still decode. Whatever the source layout (gray, RGB, 16-bit, ...), the pixels
//! are converted to 8-bit RGBA.

use std::path::Path;

use tracing::debug;

use crate::quilt_pipeline::common::error::{QuiltError, Result};
use crate::quilt_pipeline::image_store::reader::ViewReader;
use crate::quilt_pipeline::image_store::types::ViewImage;

pub struct ImageCrateReader;

impl ViewReader for ImageCrateReader {
    fn read_view(&self, path: &Path) -> Result<ViewImage> {
        let decode_error = |reason: String| QuiltError::DecodeError {
            path: path.display().to_string(),
            reason,
        };

        let decoded = image::ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| decode_error(e.to_string()))?
            .decode()
            .map_err(|e| decode_error(e.to_string()))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        debug!("Decoded {}: {}x{}", path.display(), width, height);

        Ok(ViewImage::new(width, height, rgba.into_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quilt_pipeline::image_store::types::VIEW_CHANNELS;

    #[test]
    fn rgb_source_is_expanded_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let view = ImageCrateReader.read_view(&path).unwrap();

        assert_eq!(view.dimensions(), (3, 2));
        assert_eq!(view.channels, VIEW_CHANNELS);
        assert_eq!(view.data.len(), 3 * 2 * 4);
        assert_eq!(view.pixel(2, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let result = ImageCrateReader.read_view(&path);

        assert!(matches!(result, Err(QuiltError::DecodeError { .. })));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();

        let result = ImageCrateReader.read_view(&dir.path().join("nope.png"));

        assert!(matches!(result, Err(QuiltError::DecodeError { .. })));
    }
}
