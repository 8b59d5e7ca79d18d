//! Image store module
//!
//! Decoding of view images into RGBA8 host buffers, ordered directory listing,
//! and encoding of the two output artifacts.

mod reader;
mod image_reader;
mod writer;
mod image_writer;
mod listing;
pub mod types;

pub use reader::ViewReader;
pub use image_reader::ImageCrateReader;
pub use writer::ArtifactWriter;
pub use image_writer::ImageCrateWriter;
pub use listing::list_ordered_directory;
pub use types::{FloatImage, ViewImage, VIEW_CHANNELS};
