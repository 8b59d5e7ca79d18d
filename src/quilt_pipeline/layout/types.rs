//! Quilt geometry types

use std::fmt;

use crate::quilt_pipeline::common::error::{QuiltError, Result};

/// Declared row/column count of a quilt. Both are at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuiltGrid {
    rows: u32,
    cols: u32,
}

impl QuiltGrid {
    /// Validates a caller-supplied grid. Counts arrive signed from the command
    /// line so that `-rows -2` is reported as a layout error rather than a parse error.
    pub fn new(rows: i64, cols: i64) -> Result<Self> {
        let positive = |name: &str, value: i64| -> Result<u32> {
            u32::try_from(value)
                .ok()
                .filter(|&v| v > 0)
                .ok_or_else(|| {
                    QuiltError::InvalidLayout(format!("{name} must be a positive integer, got {value}"))
                })
        };
        let grid = Self {
            rows: positive("rows", rows)?,
            cols: positive("cols", cols)?,
        };
        if grid.rows.checked_mul(grid.cols).is_none() {
            return Err(QuiltError::InvalidLayout(format!(
                "{rows}x{cols} views do not fit a 32-bit view count"
            )));
        }
        Ok(grid)
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn view_count(&self) -> u32 {
        self.rows * self.cols
    }
}

impl Default for QuiltGrid {
    fn default() -> Self {
        Self { rows: 1, cols: 1 }
    }
}

impl fmt::Display for QuiltGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows x {} cols", self.rows, self.cols)
    }
}

/// How the quilt was supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// One pre-tiled image holding every view
    SingleFile,
    /// A directory with one image per view
    Directory,
}

/// Resolved pixel geometry of one conversion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuiltLayout {
    pub grid: QuiltGrid,
    pub mode: InputMode,
    /// Width of one view in pixels
    pub tile_width: u32,
    /// Height of one view in pixels
    pub tile_height: u32,
    /// Width of the whole quilt canvas in pixels
    pub canvas_width: u32,
    /// Height of the whole quilt canvas in pixels
    pub canvas_height: u32,
}

/// Canvas position of one view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePlacement {
    pub column: u32,
    /// Canvas tile row, 0 at the top of the decoded canvas
    pub row: u32,
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
}
