use std::path::Path;

use crate::quilt_pipeline::common::error::Result;
use crate::quilt_pipeline::image_store::types::ViewImage;

pub trait ViewReader {
    fn read_view(&self, path: &Path) -> Result<ViewImage>;
}
