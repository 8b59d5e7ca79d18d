use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::quilt_pipeline::common::error::{QuiltError, Result};
use crate::quilt_pipeline::image_store::{list_ordered_directory, ViewImage, ViewReader};
use crate::quilt_pipeline::layout::types::{InputMode, QuiltGrid, QuiltLayout};

/// Where the pixels of a resolved quilt come from
#[derive(Debug)]
pub enum QuiltSource {
    /// The pre-tiled image, already decoded while resolving
    SingleFile(ViewImage),
    /// Per-view files in lexical order
    Directory(Vec<PathBuf>),
}

#[derive(Debug)]
pub struct ResolvedQuilt {
    pub layout: QuiltLayout,
    pub source: QuiltSource,
}

/// Determines tile and canvas geometry for `input`.
///
/// A single file is decoded once and split into `rows x cols` tiles using
/// truncating division; leftover pixels stay on the canvas but belong to no tile.
/// For a directory, only the first listed file is decoded to learn the tile size.
pub fn resolve<R: ViewReader>(reader: &R, input: &Path, grid: QuiltGrid) -> Result<ResolvedQuilt> {
    if input.is_dir() {
        resolve_directory(reader, input, grid)
    } else {
        resolve_single_file(reader, input, grid)
    }
}

fn resolve_single_file<R: ViewReader>(reader: &R, input: &Path, grid: QuiltGrid) -> Result<ResolvedQuilt> {
    let quilt = reader.read_view(input)?;
    let tile_width = quilt.width / grid.cols();
    let tile_height = quilt.height / grid.rows();
    if quilt.width % grid.cols() != 0 || quilt.height % grid.rows() != 0 {
        debug!(
            "Quilt {}x{} is not divisible by {}, tiles truncated to {}x{}",
            quilt.width, quilt.height, grid, tile_width, tile_height
        );
    }
    if tile_width == 0 || tile_height == 0 {
        return Err(QuiltError::InvalidLayout(format!(
            "{}x{} image is too small for {}",
            quilt.width, quilt.height, grid
        )));
    }

    let layout = QuiltLayout {
        grid,
        mode: InputMode::SingleFile,
        tile_width,
        tile_height,
        canvas_width: quilt.width,
        canvas_height: quilt.height,
    };
    info!(
        "Single quilt image {}x{}, tile {}x{}",
        layout.canvas_width, layout.canvas_height, tile_width, tile_height
    );
    Ok(ResolvedQuilt {
        layout,
        source: QuiltSource::SingleFile(quilt),
    })
}

fn resolve_directory<R: ViewReader>(reader: &R, input: &Path, grid: QuiltGrid) -> Result<ResolvedQuilt> {
    let files = list_ordered_directory(input)?;
    let first = files.first().ok_or_else(|| {
        QuiltError::InvalidLayout(format!("input directory {} is empty", input.display()))
    })?;

    let (tile_width, tile_height) = reader.read_view(first)?.dimensions();
    if tile_width == 0 || tile_height == 0 {
        return Err(QuiltError::InvalidLayout(format!(
            "first view {} has no pixels",
            first.display()
        )));
    }
    let canvas_width = tile_width.checked_mul(grid.cols());
    let canvas_height = tile_height.checked_mul(grid.rows());
    let (Some(canvas_width), Some(canvas_height)) = (canvas_width, canvas_height) else {
        return Err(QuiltError::InvalidLayout(format!(
            "{tile_width}x{tile_height} views do not fit a {grid} canvas"
        )));
    };

    let layout = QuiltLayout {
        grid,
        mode: InputMode::Directory,
        tile_width,
        tile_height,
        canvas_width,
        canvas_height,
    };
    info!(
        "{} view files, tile {}x{}, canvas {}x{}",
        files.len(),
        tile_width,
        tile_height,
        canvas_width,
        canvas_height
    );
    Ok(ResolvedQuilt {
        layout,
        source: QuiltSource::Directory(files),
    })
}
