use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::quilt_pipeline::{
    common::{
        error::{QuiltError, Result},
        timing::{PipelineTimings, Timer},
    },
    conversions::{
        state::{ConversionState, StateTracker},
        types::{ConversionConfig, ConversionReport},
    },
    device::{ComputeDevice, DeviceTexture, KernelSpec, Region, TextureDescriptor},
    image_store::{ArtifactWriter, FloatImage, ImageCrateReader, ImageCrateWriter, ViewImage, ViewReader, VIEW_CHANNELS},
    layout::{self, QuiltLayout, QuiltSource},
};

/// Converts a quilt (one pre-tiled image or a directory of views) into the
/// interleaved native image on a compute device.
pub struct QuiltToNativePipeline<D: ComputeDevice, R: ViewReader, W: ArtifactWriter> {
    device: D,
    reader: R,
    writer: W,
    config: ConversionConfig,
}

struct Assembly {
    views_used: usize,
    skipped: Vec<PathBuf>,
}

impl<D: ComputeDevice> QuiltToNativePipeline<D, ImageCrateReader, ImageCrateWriter> {
    pub fn new(device: D, config: ConversionConfig) -> Self {
        Self {
            device,
            reader: ImageCrateReader,
            writer: ImageCrateWriter,
            config,
        }
    }
}

impl<D: ComputeDevice, R: ViewReader, W: ArtifactWriter> QuiltToNativePipeline<D, R, W> {
    pub fn with_custom(device: D, reader: R, writer: W, config: ConversionConfig) -> Self {
        Self {
            device,
            reader,
            writer,
            config,
        }
    }

    /// Runs one conversion, writing the artifacts into `output_dir`.
    ///
    /// Artifacts written before a failure are left in place.
    #[instrument(skip(self, input, output_dir), fields(input = %input.display(), grid = %self.config.grid))]
    pub fn convert(&self, input: &Path, output_dir: &Path) -> Result<ConversionReport> {
        let mut state = StateTracker::new();
        let mut timings = PipelineTimings::new();

        match self.run(input, output_dir, &mut state, &mut timings) {
            Ok(report) => {
                if self.config.log_timings {
                    report.timings.log_summary();
                }
                Ok(report)
            }
            Err(e) => {
                let stage = state.fail();
                debug!("Conversion failed after stage `{}`", stage);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        input: &Path,
        output_dir: &Path,
        state: &mut StateTracker,
        timings: &mut PipelineTimings,
    ) -> Result<ConversionReport> {
        self.prepare_output_dir(output_dir)?;

        let timer = Timer::start("resolve_layout");
        let resolved = {
            let _span = tracing::info_span!("resolve_layout").entered();
            layout::resolve(&self.reader, input, self.config.grid)?
        };
        timings.record(timer);
        let layout = resolved.layout;
        state.advance(ConversionState::LayoutResolved);

        let timer = Timer::start("build_kernel");
        let kernel = self.device.build_kernel(&KernelSpec {
            entry: self.config.kernel_entry.clone(),
            view_count: layout.grid.view_count(),
        })?;
        timings.record(timer);

        info!("Loading images and allocating memory on {}", self.device.name());
        let timer = Timer::start("allocate_input");
        let mut quilt_texture = self
            .device
            .create_texture(TextureDescriptor::quilt(layout.canvas_width, layout.canvas_height))?;
        timings.record(timer);

        let mut quilt_path = None;
        let assembly = match resolved.source {
            QuiltSource::SingleFile(quilt) => {
                let timer = Timer::start("upload_quilt");
                let region = Region::full(quilt_texture.descriptor());
                self.device.upload_region(&mut quilt_texture, region, &quilt.data)?;
                timings.record(timer);
                Assembly {
                    views_used: 1,
                    skipped: Vec::new(),
                }
            }
            QuiltSource::Directory(files) => {
                let assembly = self.assemble_views(&layout, &files, &mut quilt_texture, timings)?;
                if self.config.store_quilt {
                    let path = output_dir.join(&self.config.quilt_file_name);
                    info!("Storing the quilt");
                    let timer = Timer::start("store_quilt");
                    self.store_quilt(&quilt_texture, &path)?;
                    timings.record(timer);
                    quilt_path = Some(path);
                }
                assembly
            }
        };
        state.advance(ConversionState::InputAssembled);

        info!("Processing on {}", self.device.name());
        let timer = Timer::start("dispatch");
        let mut native_texture = self
            .device
            .create_texture(TextureDescriptor::native(layout.tile_width, layout.tile_height))?;
        {
            let _span = tracing::info_span!("dispatch", width = layout.tile_width, height = layout.tile_height).entered();
            self.device
                .dispatch(&kernel, &quilt_texture, &mut native_texture, layout.grid)?;
        }
        timings.record(timer);
        drop(quilt_texture);
        state.advance(ConversionState::Dispatched);

        info!("Storing the result");
        let timer = Timer::start("store_native");
        let native_path = output_dir.join(&self.config.native_file_name);
        self.store_native(&native_texture, &native_path)?;
        timings.record(timer);
        state.advance(ConversionState::ResultStored);

        state.advance(ConversionState::Done);
        info!(
            width = layout.tile_width,
            height = layout.tile_height,
            views = assembly.views_used,
            "Conversion complete in {:.3}ms",
            timings.total_duration().as_secs_f64() * 1000.0
        );

        Ok(ConversionReport {
            layout,
            device: self.device.name(),
            views_used: assembly.views_used,
            skipped: assembly.skipped,
            quilt_path,
            native_path,
            final_state: state.state(),
            timings: timings.clone(),
        })
    }

    fn prepare_output_dir(&self, output_dir: &Path) -> Result<()> {
        if output_dir.is_dir() || !self.config.create_output_dir {
            return Ok(());
        }
        info!("Creating output directory {}", output_dir.display());
        std::fs::create_dir_all(output_dir).map_err(|e| QuiltError::EncodeError {
            path: output_dir.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads, checks and uploads each view in order, one at a time.
    fn assemble_views(
        &self,
        layout: &QuiltLayout,
        files: &[PathBuf],
        texture: &mut D::Texture,
        timings: &mut PipelineTimings,
    ) -> Result<Assembly> {
        let expected = layout.grid.view_count() as usize;
        // One missing view (a dropped last frame) is tolerated.
        if files.len() + 1 < expected {
            return Err(QuiltError::IncompleteQuilt {
                found: files.len(),
                expected,
            });
        }
        let skipped = files.iter().skip(expected).cloned().collect::<Vec<_>>();
        if !skipped.is_empty() {
            warn!(
                "The number of input files ({}) is higher than the expected quilt size. Using only the first {} files",
                files.len(),
                expected
            );
        }

        let mut views_used = 0;
        for (index, path) in files.iter().take(expected).enumerate() {
            let _span = tracing::info_span!("view", index).entered();

            let timer = Timer::start("load_view");
            let view = self.reader.read_view(path)?;
            timings.record(timer);
            check_view(layout, path, &view)?;

            let placement = layout.placement(index as u32).ok_or_else(|| {
                QuiltError::InvalidLayout(format!("view {index} lies outside the {} quilt", layout.grid))
            })?;
            debug!(
                "{} -> tile ({}, {}) at ({}, {})",
                path.display(),
                placement.column,
                placement.row,
                placement.x,
                placement.y
            );

            let timer = Timer::start("upload_view");
            let region = Region {
                x: placement.x,
                y: placement.y,
                width: view.width,
                height: view.height,
            };
            self.device.upload_region(texture, region, &view.data).map_err(|e| match e {
                QuiltError::TransferError(reason) => {
                    QuiltError::TransferError(format!("cannot upload {}: {reason}", path.display()))
                }
                other => other,
            })?;
            timings.record(timer);
            views_used += 1;
        }

        if views_used < expected {
            warn!("Quilt is missing its last view; that tile stays blank");
        }
        Ok(Assembly { views_used, skipped })
    }

    fn store_quilt(&self, texture: &D::Texture, path: &Path) -> Result<()> {
        let desc = *texture.descriptor();
        let data = self.device.download(texture)?.into_rgba8()?;
        self.writer.write_quilt(path, &ViewImage::new(desc.width, desc.height, data))
    }

    fn store_native(&self, texture: &D::Texture, path: &Path) -> Result<()> {
        let desc = *texture.descriptor();
        let data = self.device.download(texture)?.into_r32f()?;
        self.writer.write_native(
            path,
            &FloatImage {
                width: desc.width,
                height: desc.height,
                data,
            },
        )
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ConversionConfig) {
        self.config = config;
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

fn check_view(layout: &QuiltLayout, path: &Path, view: &ViewImage) -> Result<()> {
    if view.width != layout.tile_width || view.height != layout.tile_height || view.channels != VIEW_CHANNELS {
        return Err(QuiltError::InconsistentView {
            path: path.display().to_string(),
            expected_width: layout.tile_width,
            expected_height: layout.tile_height,
            expected_channels: VIEW_CHANNELS,
            found_width: view.width,
            found_height: view.height,
            found_channels: view.channels,
        });
    }
    Ok(())
}
