//! Quilt conversion configuration and result types

use std::path::PathBuf;

use crate::quilt_pipeline::common::timing::PipelineTimings;
use crate::quilt_pipeline::conversions::state::ConversionState;
use crate::quilt_pipeline::device::INTERLEAVE_ENTRY;
use crate::quilt_pipeline::layout::{QuiltGrid, QuiltLayout};

pub const DEFAULT_QUILT_FILE_NAME: &str = "quilt.png";
pub const DEFAULT_NATIVE_FILE_NAME: &str = "output.hdr";

/// Configuration for one quilt to native conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Declared rows and columns of the quilt
    pub grid: QuiltGrid,
    /// Entry point of the interleave kernel
    pub kernel_entry: String,
    /// File name of the assembled quilt inside the output directory
    pub quilt_file_name: String,
    /// File name of the interleaved result inside the output directory
    pub native_file_name: String,
    /// Whether directory input also stores the assembled quilt
    pub store_quilt: bool,
    /// Whether a missing output directory is created instead of failing
    pub create_output_dir: bool,
    /// Whether a per-stage timing summary is logged after a successful run
    pub log_timings: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            grid: QuiltGrid::default(),
            kernel_entry: INTERLEAVE_ENTRY.to_string(),
            quilt_file_name: DEFAULT_QUILT_FILE_NAME.to_string(),
            native_file_name: DEFAULT_NATIVE_FILE_NAME.to_string(),
            store_quilt: true,
            create_output_dir: false,
            log_timings: false,
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    grid: Option<QuiltGrid>,
    kernel_entry: Option<String>,
    quilt_file_name: Option<String>,
    native_file_name: Option<String>,
    store_quilt: Option<bool>,
    create_output_dir: Option<bool>,
    log_timings: Option<bool>,
}

impl ConversionConfigBuilder {
    pub fn grid(mut self, grid: QuiltGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn kernel_entry(mut self, entry: impl Into<String>) -> Self {
        self.kernel_entry = Some(entry.into());
        self
    }

    pub fn quilt_file_name(mut self, name: impl Into<String>) -> Self {
        self.quilt_file_name = Some(name.into());
        self
    }

    pub fn native_file_name(mut self, name: impl Into<String>) -> Self {
        self.native_file_name = Some(name.into());
        self
    }

    pub fn store_quilt(mut self, enable: bool) -> Self {
        self.store_quilt = Some(enable);
        self
    }

    pub fn create_output_dir(mut self, enable: bool) -> Self {
        self.create_output_dir = Some(enable);
        self
    }

    pub fn log_timings(mut self, enable: bool) -> Self {
        self.log_timings = Some(enable);
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            grid: self.grid.unwrap_or(default.grid),
            kernel_entry: self.kernel_entry.unwrap_or(default.kernel_entry),
            quilt_file_name: self.quilt_file_name.unwrap_or(default.quilt_file_name),
            native_file_name: self.native_file_name.unwrap_or(default.native_file_name),
            store_quilt: self.store_quilt.unwrap_or(default.store_quilt),
            create_output_dir: self.create_output_dir.unwrap_or(default.create_output_dir),
            log_timings: self.log_timings.unwrap_or(default.log_timings),
        }
    }
}

/// What a successful conversion did
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub layout: QuiltLayout,
    /// Name of the compute device that ran the kernel
    pub device: String,
    /// Number of views placed on the canvas (the whole quilt counts as one in single-file mode)
    pub views_used: usize,
    /// Surplus directory entries beyond `rows * cols`, not read
    pub skipped: Vec<PathBuf>,
    pub quilt_path: Option<PathBuf>,
    pub native_path: PathBuf,
    pub final_state: ConversionState,
    pub timings: PipelineTimings,
}
