use std::sync::Arc;

use cudarc::driver::safe::*;
use cudarc::driver::sys::CUdevice_attribute;
use cudarc::nvrtc::{compile_ptx_with_opts, CompileError, CompileOptions};
use tracing::{debug, info, warn};

use crate::quilt_pipeline::common::error::{QuiltError, Result};
use crate::quilt_pipeline::device::backend::{ComputeDevice, DeviceTexture};
use crate::quilt_pipeline::device::interleave::INTERLEAVE_ENTRY;
use crate::quilt_pipeline::device::types::{
    validate_dispatch, validate_upload, KernelSpec, Region, TexelBuffer, TextureDescriptor, TextureFormat,
};
use crate::quilt_pipeline::layout::QuiltGrid;

const INTERLEAVE_SOURCE: &str = include_str!("../../cuda/kernels/quilt_interleave.cu");

const BLOCK_SIZE: u32 = 32;

enum CudaStorage {
    Rgba8(CudaSlice<u8>),
    R32Float(CudaSlice<f32>),
}

pub struct CudaTexture {
    desc: TextureDescriptor,
    storage: CudaStorage,
}

impl DeviceTexture for CudaTexture {
    fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }
}

pub struct CudaKernel {
    entry: String,
    function: CudaFunction,
}

/// CUDA context, default stream and 2D size limits of one GPU
pub struct CudaDevice {
    ordinal: usize,
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    max_width: u32,
    max_height: u32,
}

fn driver_error(what: &str, e: DriverError) -> QuiltError {
    QuiltError::DeviceUnavailable(format!("{what}: {e}"))
}

impl CudaDevice {
    /// Creates a context on GPU `ordinal`.
    pub fn new(ordinal: usize) -> Result<Self> {
        // cudarc panics instead of erroring when libcuda cannot be loaded.
        let ctx = std::panic::catch_unwind(|| CudaContext::new(ordinal))
            .map_err(|_| QuiltError::DeviceUnavailable("CUDA driver library not found".to_string()))?
            .map_err(|e| driver_error("cannot create CUDA context", e))?;
        let stream = ctx.default_stream();

        let attribute = |attr: CUdevice_attribute| -> Result<u32> {
            let value = ctx
                .attribute(attr)
                .map_err(|e| driver_error("cannot query device limits", e))?;
            Ok(u32::try_from(value).unwrap_or(0))
        };
        let max_width = attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAXIMUM_TEXTURE2D_WIDTH)?;
        let max_height = attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAXIMUM_TEXTURE2D_HEIGHT)?;

        info!("CUDA device {} ready, max 2D image {}x{}", ordinal, max_width, max_height);
        Ok(Self {
            ordinal,
            ctx,
            stream,
            max_width,
            max_height,
        })
    }

    fn transfer_error(&self, what: &str, e: DriverError) -> QuiltError {
        QuiltError::TransferError(format!("{what} on cuda:{}: {e}", self.ordinal))
    }
}

impl ComputeDevice for CudaDevice {
    type Texture = CudaTexture;
    type Kernel = CudaKernel;

    fn name(&self) -> String {
        format!("cuda:{}", self.ordinal)
    }

    fn create_texture(&self, desc: TextureDescriptor) -> Result<CudaTexture> {
        if desc.width == 0 || desc.height == 0 || desc.width > self.max_width || desc.height > self.max_height {
            return Err(QuiltError::DeviceAllocation(format!(
                "{}x{} is outside the device limit of {}x{}",
                desc.width, desc.height, self.max_width, self.max_height
            )));
        }

        let alloc_error = |e: DriverError| {
            QuiltError::DeviceAllocation(format!("{}x{} {:?}: {e}", desc.width, desc.height, desc.format))
        };
        let storage = match desc.format {
            TextureFormat::Rgba8Uint => {
                CudaStorage::Rgba8(self.stream.alloc_zeros::<u8>(desc.byte_size()).map_err(alloc_error)?)
            }
            TextureFormat::R32Float => {
                CudaStorage::R32Float(self.stream.alloc_zeros::<f32>(desc.texel_count()).map_err(alloc_error)?)
            }
        };
        debug!("Allocated {:?} texture {}x{}", desc.format, desc.width, desc.height);
        Ok(CudaTexture { desc, storage })
    }

    fn upload_region(&self, texture: &mut CudaTexture, region: Region, pixels: &[u8]) -> Result<()> {
        validate_upload(&texture.desc, region, pixels)?;
        let CudaStorage::Rgba8(slice) = &mut texture.storage else {
            return Err(QuiltError::TransferError("texture storage is not RGBA8".to_string()));
        };

        let row_bytes = region.width as usize * 4;
        let pitch = texture.desc.width as usize * 4;
        if row_bytes == pitch {
            let start = region.y as usize * pitch;
            let mut view = slice.slice_mut(start..start + pixels.len());
            self.stream
                .memcpy_htod(pixels, &mut view)
                .map_err(|e| self.transfer_error("upload", e))?;
        } else if row_bytes > 0 {
            for (row, src) in pixels.chunks_exact(row_bytes).enumerate() {
                let start = (region.y as usize + row) * pitch + region.x as usize * 4;
                let mut view = slice.slice_mut(start..start + row_bytes);
                self.stream
                    .memcpy_htod(src, &mut view)
                    .map_err(|e| self.transfer_error("upload", e))?;
            }
        }
        self.stream
            .synchronize()
            .map_err(|e| self.transfer_error("upload sync", e))
    }

    fn download(&self, texture: &CudaTexture) -> Result<TexelBuffer> {
        match &texture.storage {
            CudaStorage::Rgba8(slice) => self
                .stream
                .clone_dtoh(slice)
                .map(TexelBuffer::Rgba8)
                .map_err(|e| self.transfer_error("download", e)),
            CudaStorage::R32Float(slice) => self
                .stream
                .clone_dtoh(slice)
                .map(TexelBuffer::R32Float)
                .map_err(|e| self.transfer_error("download", e)),
        }
    }

    fn build_kernel(&self, spec: &KernelSpec) -> Result<CudaKernel> {
        if spec.entry != INTERLEAVE_ENTRY {
            return Err(QuiltError::KernelError(format!("no CUDA kernel named `{}`", spec.entry)));
        }

        let options = CompileOptions {
            options: vec![format!("-DVIEW_COUNT={}", spec.view_count)],
            ..Default::default()
        };
        let ptx = compile_ptx_with_opts(INTERLEAVE_SOURCE, options).map_err(|e| {
            if let CompileError::CompileError { log, .. } = &e {
                let log = log.to_string_lossy();
                if !log.trim().is_empty() {
                    warn!("{}", log.trim());
                }
            }
            QuiltError::KernelError(format!("cannot compile `{}`: {e}", spec.entry))
        })?;

        let module = self
            .ctx
            .load_module(ptx)
            .map_err(|e| QuiltError::KernelError(format!("cannot load module: {e}")))?;
        let function = module
            .load_function(&spec.entry)
            .map_err(|e| QuiltError::KernelError(format!("cannot load `{}`: {e}", spec.entry)))?;
        debug!("Built `{}` for {} views", spec.entry, spec.view_count);

        Ok(CudaKernel {
            entry: spec.entry.clone(),
            function,
        })
    }

    fn dispatch(
        &self,
        kernel: &CudaKernel,
        input: &CudaTexture,
        output: &mut CudaTexture,
        grid: QuiltGrid,
    ) -> Result<()> {
        validate_dispatch(&input.desc, &output.desc)?;
        let CudaStorage::Rgba8(quilt) = &input.storage else {
            return Err(QuiltError::KernelError("kernel input must be RGBA8".to_string()));
        };
        let (tile_width, tile_height) = (output.desc.width, output.desc.height);
        let CudaStorage::R32Float(native) = &mut output.storage else {
            return Err(QuiltError::KernelError("kernel output must be R32F".to_string()));
        };

        let canvas_width = input.desc.width as i32;
        let canvas_height = input.desc.height as i32;
        let tile_width_i32 = tile_width as i32;
        let tile_height_i32 = tile_height as i32;
        let rows = grid.rows() as i32;
        let cols = grid.cols() as i32;

        let mut launch_args = self.stream.launch_builder(&kernel.function);
        launch_args.arg(quilt);
        launch_args.arg(native);
        launch_args.arg(&canvas_width);
        launch_args.arg(&canvas_height);
        launch_args.arg(&tile_width_i32);
        launch_args.arg(&tile_height_i32);
        launch_args.arg(&rows);
        launch_args.arg(&cols);

        let cfg = LaunchConfig {
            grid_dim: (
                tile_width.div_ceil(BLOCK_SIZE),
                tile_height.div_ceil(BLOCK_SIZE),
                1,
            ),
            block_dim: (BLOCK_SIZE, BLOCK_SIZE, 1),
            shared_mem_bytes: 0,
        };

        debug!("Launching `{}` with {:?}", kernel.entry, cfg.grid_dim);
        unsafe { launch_args.launch(cfg) }
            .map_err(|e| QuiltError::KernelError(format!("launch of `{}` failed: {e}", kernel.entry)))?;
        self.stream
            .synchronize()
            .map_err(|e| QuiltError::KernelError(format!("`{}` did not complete: {e}", kernel.entry)))
    }
}
