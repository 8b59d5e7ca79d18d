use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::logger::CapturedLog;
use crate::quilt_pipeline::common::error::{QuiltError, Result};
use crate::quilt_pipeline::conversions::{ConversionConfig, ConversionState, QuiltToNativePipeline};
use crate::quilt_pipeline::device::{
    ComputeDevice, CpuDevice, CpuKernelHandle, CpuTexture, KernelSpec, Region, TexelBuffer,
    TextureDescriptor,
};
use crate::quilt_pipeline::image_store::{
    ArtifactWriter, FloatImage, ImageCrateReader, ViewImage, ViewReader,
};
use crate::quilt_pipeline::layout::{placement_for, QuiltGrid};

struct MockReader;

impl ViewReader for MockReader {
    fn read_view(&self, path: &Path) -> Result<ViewImage> {
        Err(QuiltError::DecodeError {
            path: path.display().to_string(),
            reason: "Mock decode error".to_string(),
        })
    }
}

#[derive(Default)]
struct RecordingWriter {
    should_fail: bool,
    quilts: Arc<Mutex<Vec<ViewImage>>>,
    natives: Arc<Mutex<Vec<FloatImage>>>,
}

impl ArtifactWriter for RecordingWriter {
    fn write_quilt(&self, path: &Path, image: &ViewImage) -> Result<()> {
        if self.should_fail {
            return Err(QuiltError::EncodeError {
                path: path.display().to_string(),
                reason: "Mock encode error".to_string(),
            });
        }
        self.quilts.lock().unwrap().push(image.clone());
        Ok(())
    }

    fn write_native(&self, path: &Path, image: &FloatImage) -> Result<()> {
        if self.should_fail {
            return Err(QuiltError::EncodeError {
                path: path.display().to_string(),
                reason: "Mock encode error".to_string(),
            });
        }
        self.natives.lock().unwrap().push(image.clone());
        Ok(())
    }
}

/// CPU device that counts uploads and can simulate a lost device.
struct CountingDevice {
    inner: CpuDevice,
    uploads: Cell<usize>,
    fail_uploads: bool,
}

impl CountingDevice {
    fn new(fail_uploads: bool) -> Self {
        Self {
            inner: CpuDevice::new(),
            uploads: Cell::new(0),
            fail_uploads,
        }
    }
}

impl ComputeDevice for CountingDevice {
    type Texture = CpuTexture;
    type Kernel = CpuKernelHandle;

    fn name(&self) -> String {
        "counting-cpu".to_string()
    }

    fn create_texture(&self, desc: TextureDescriptor) -> Result<CpuTexture> {
        self.inner.create_texture(desc)
    }

    fn upload_region(&self, texture: &mut CpuTexture, region: Region, pixels: &[u8]) -> Result<()> {
        self.uploads.set(self.uploads.get() + 1);
        if self.fail_uploads {
            return Err(QuiltError::TransferError("device lost".to_string()));
        }
        self.inner.upload_region(texture, region, pixels)
    }

    fn download(&self, texture: &CpuTexture) -> Result<TexelBuffer> {
        self.inner.download(texture)
    }

    fn build_kernel(&self, spec: &KernelSpec) -> Result<CpuKernelHandle> {
        self.inner.build_kernel(spec)
    }

    fn dispatch(
        &self,
        kernel: &CpuKernelHandle,
        input: &CpuTexture,
        output: &mut CpuTexture,
        grid: QuiltGrid,
    ) -> Result<()> {
        self.inner.dispatch(kernel, input, output, grid)
    }
}

fn view_color(index: u32) -> [u8; 4] {
    [index as u8 * 20, 200 - index as u8 * 10, 7, 255]
}

fn write_view(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba(color))
        .save(&path)
        .unwrap();
    path
}

fn write_views(dir: &Path, count: u32, width: u32, height: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|i| write_view(dir, &format!("view_{i:02}.png"), width, height, view_color(i)))
        .collect()
}

fn config(rows: i64, cols: i64) -> ConversionConfig {
    ConversionConfig::builder()
        .grid(QuiltGrid::new(rows, cols).unwrap())
        .build()
}

fn assert_tile(quilt: &image::RgbaImage, grid: QuiltGrid, index: u32, tw: u32, th: u32, color: [u8; 4]) {
    let placement = placement_for(index, grid, tw, th).unwrap();
    for y in placement.y..placement.y + th {
        for x in placement.x..placement.x + tw {
            assert_eq!(quilt.get_pixel(x, y).0, color, "view {index} at ({x}, {y})");
        }
    }
}

#[test]
fn test_directory_quilt_matches_placement() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_views(input.path(), 6, 4, 3);
    let pipeline = QuiltToNativePipeline::new(CpuDevice::new(), config(2, 3));

    let report = pipeline.convert(input.path(), output.path()).unwrap();

    assert_eq!(report.final_state, ConversionState::Done);
    assert_eq!(report.views_used, 6);
    assert!(report.skipped.is_empty());
    assert_eq!((report.layout.canvas_width, report.layout.canvas_height), (12, 6));

    let quilt_path = report.quilt_path.clone().unwrap();
    assert_eq!(quilt_path, output.path().join("quilt.png"));
    let quilt = image::open(&quilt_path).unwrap().to_rgba8();
    assert_eq!(quilt.dimensions(), (12, 6));
    let grid = QuiltGrid::new(2, 3).unwrap();
    for i in 0..6 {
        assert_tile(&quilt, grid, i, 4, 3, view_color(i));
    }
    // View 0 sits in the bottom-left tile.
    assert_eq!(quilt.get_pixel(0, 5).0, view_color(0));
    assert_eq!(quilt.get_pixel(0, 0).0, view_color(3));

    let native = image::open(&report.native_path).unwrap();
    assert_eq!((native.width(), native.height()), (4, 3));
}

#[test]
fn test_one_missing_view_is_tolerated() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_views(input.path(), 3, 2, 2);
    let pipeline = QuiltToNativePipeline::new(CpuDevice::new(), config(2, 2));

    let report = pipeline.convert(input.path(), output.path()).unwrap();

    assert_eq!(report.views_used, 3);
    let quilt = image::open(output.path().join("quilt.png")).unwrap().to_rgba8();
    let grid = QuiltGrid::new(2, 2).unwrap();
    for i in 0..3 {
        assert_tile(&quilt, grid, i, 2, 2, view_color(i));
    }
    assert_tile(&quilt, grid, 3, 2, 2, [0, 0, 0, 0]);
}

#[test]
fn test_two_missing_views_fail() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_views(input.path(), 2, 2, 2);
    let pipeline = QuiltToNativePipeline::new(CpuDevice::new(), config(2, 2));

    let result = pipeline.convert(input.path(), output.path());

    assert!(matches!(
        result,
        Err(QuiltError::IncompleteQuilt { found: 2, expected: 4 })
    ));
    assert!(!output.path().join("quilt.png").exists());
    assert!(!output.path().join("output.hdr").exists());
}

#[test]
fn test_surplus_views_are_skipped() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let files = write_views(input.path(), 5, 2, 2);
    let pipeline = QuiltToNativePipeline::new(CpuDevice::new(), config(2, 2));
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    let report = tracing::subscriber::with_default(subscriber, || {
        pipeline.convert(input.path(), output.path())
    })
    .unwrap();

    assert_eq!(report.views_used, 4);
    assert_eq!(report.skipped, vec![files[4].clone()]);
    let warnings = log.contents();
    assert!(warnings.contains("WARN"));
    assert!(warnings.contains("The number of input files (5) is higher than the expected quilt size"));
    let quilt = image::open(output.path().join("quilt.png")).unwrap().to_rgba8();
    let grid = QuiltGrid::new(2, 2).unwrap();
    for i in 0..4 {
        assert_tile(&quilt, grid, i, 2, 2, view_color(i));
    }
}

#[test]
fn test_mismatched_view_fails_before_upload() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_view(input.path(), "a.png", 100, 100, view_color(0));
    write_view(input.path(), "b.png", 120, 100, view_color(1));
    let device = CountingDevice::new(false);
    let pipeline = QuiltToNativePipeline::new(device, config(1, 2));

    let result = pipeline.convert(input.path(), output.path());

    match result {
        Err(QuiltError::InconsistentView {
            path,
            expected_width,
            found_width,
            ..
        }) => {
            assert!(path.ends_with("b.png"));
            assert_eq!((expected_width, found_width), (100, 120));
        }
        other => panic!("expected InconsistentView, got {other:?}"),
    }
    assert_eq!(pipeline.device().uploads.get(), 1);
    assert!(!output.path().join("quilt.png").exists());
}

#[test]
fn test_uneven_single_file_truncates_tiles() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let quilt = write_view(input.path(), "quilt.png", 10, 7, [90, 90, 90, 255]);
    let pipeline = QuiltToNativePipeline::new(CpuDevice::new(), config(2, 3));

    let report = pipeline.convert(&quilt, output.path()).unwrap();

    assert_eq!((report.layout.tile_width, report.layout.tile_height), (3, 3));
    assert_eq!((report.layout.canvas_width, report.layout.canvas_height), (10, 7));
    assert_eq!(report.quilt_path, None);
    assert!(!output.path().join("quilt.png").exists());
    let native = image::open(&report.native_path).unwrap();
    assert_eq!((native.width(), native.height()), (3, 3));
}

#[test]
fn test_native_result_samples_each_view() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    // 1 row x 2 cols of 2x1 tiles: view 0 white, view 1 black.
    let path = input.path().join("quilt.png");
    let mut quilt = image::RgbaImage::from_pixel(4, 1, image::Rgba([0, 0, 0, 255]));
    quilt.put_pixel(0, 0, image::Rgba([255, 255, 255, 255]));
    quilt.put_pixel(1, 0, image::Rgba([255, 255, 255, 255]));
    quilt.save(&path).unwrap();

    let writer = RecordingWriter::default();
    let natives = writer.natives.clone();
    let pipeline = QuiltToNativePipeline::with_custom(CpuDevice::new(), ImageCrateReader, writer, config(1, 2));

    pipeline.convert(&path, output.path()).unwrap();

    let natives = natives.lock().unwrap();
    assert_eq!(natives.len(), 1);
    assert_eq!((natives[0].width, natives[0].height), (2, 1));
    assert!((natives[0].data[0] - 1.0).abs() < 1e-5);
    assert_eq!(natives[0].data[1], 0.0);
}

#[test]
fn test_transfer_failure_is_not_retried() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_views(input.path(), 4, 2, 2);
    let pipeline = QuiltToNativePipeline::new(CountingDevice::new(true), config(2, 2));

    let result = pipeline.convert(input.path(), output.path());

    assert!(matches!(result, Err(QuiltError::TransferError(_))));
    assert_eq!(pipeline.device().uploads.get(), 1);
}

#[test]
fn test_writer_failure() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_views(input.path(), 4, 2, 2);
    let writer = RecordingWriter {
        should_fail: true,
        ..Default::default()
    };
    let pipeline = QuiltToNativePipeline::with_custom(CpuDevice::new(), ImageCrateReader, writer, config(2, 2));

    let result = pipeline.convert(input.path(), output.path());

    assert!(matches!(result, Err(QuiltError::EncodeError { .. })));
}

#[test]
fn test_reader_failure() {
    let output = tempfile::tempdir().unwrap();
    let pipeline = QuiltToNativePipeline::with_custom(
        CpuDevice::new(),
        MockReader,
        RecordingWriter::default(),
        config(1, 1),
    );

    let result = pipeline.convert(Path::new("fake_quilt.png"), output.path());

    assert!(matches!(result, Err(QuiltError::DecodeError { .. })));
}

#[test]
fn test_canvas_larger_than_device_limit() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_views(input.path(), 4, 5, 5);
    let device = CpuDevice::new().with_max_texture_dimension(8);
    let pipeline = QuiltToNativePipeline::new(device, config(2, 2));

    let result = pipeline.convert(input.path(), output.path());

    assert!(matches!(result, Err(QuiltError::DeviceAllocation(_))));
}

#[test]
fn test_empty_directory_is_invalid_layout() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let pipeline = QuiltToNativePipeline::new(CpuDevice::new(), config(2, 2));

    let result = pipeline.convert(input.path(), output.path());

    assert!(matches!(result, Err(QuiltError::InvalidLayout(_))));
}

#[test]
fn test_unknown_kernel_fails_before_any_artifact() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_views(input.path(), 4, 2, 2);
    let config = ConversionConfig::builder()
        .grid(QuiltGrid::new(2, 2).unwrap())
        .kernel_entry("kernelMain")
        .build();
    let pipeline = QuiltToNativePipeline::new(CpuDevice::new(), config);

    let result = pipeline.convert(input.path(), output.path());

    assert!(matches!(result, Err(QuiltError::KernelError(_))));
    assert!(!output.path().join("quilt.png").exists());
}

#[test]
fn test_missing_output_directory() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let target = output.path().join("nested").join("out");
    write_views(input.path(), 4, 2, 2);

    let strict = QuiltToNativePipeline::new(CpuDevice::new(), config(2, 2));
    assert!(matches!(
        strict.convert(input.path(), &target),
        Err(QuiltError::EncodeError { .. })
    ));

    let config = ConversionConfig::builder()
        .grid(QuiltGrid::new(2, 2).unwrap())
        .create_output_dir(true)
        .build();
    let creating = QuiltToNativePipeline::new(CpuDevice::new(), config);
    let report = creating.convert(input.path(), &target).unwrap();
    assert!(report.native_path.exists());
    assert!(target.join("quilt.png").exists());
}

#[test]
fn test_config_builder() {
    let config = ConversionConfig::builder()
        .grid(QuiltGrid::new(6, 8).unwrap())
        .native_file_name("native.hdr")
        .store_quilt(false)
        .log_timings(true)
        .build();

    assert_eq!(config.grid.view_count(), 48);
    assert_eq!(config.native_file_name, "native.hdr");
    assert_eq!(config.quilt_file_name, "quilt.png");
    assert!(!config.store_quilt);
    assert!(!config.create_output_dir);
    assert!(config.log_timings);
}
