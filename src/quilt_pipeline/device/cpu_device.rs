//! Software compute device.
//!
//! Textures live in host memory and kernels are plain Rust functions looked up
//! by entry name. Used when no GPU backend is available and by the pipeline tests.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::quilt_pipeline::common::error::{QuiltError, Result};
use crate::quilt_pipeline::device::backend::{ComputeDevice, DeviceTexture};
use crate::quilt_pipeline::device::interleave::{
    CpuKernel, KernelInvocation, LenticularInterleave, INTERLEAVE_ENTRY,
};
use crate::quilt_pipeline::device::types::{
    validate_dispatch, validate_upload, KernelSpec, Region, TexelBuffer, TextureDescriptor, TextureFormat,
};
use crate::quilt_pipeline::layout::QuiltGrid;

/// Largest texture edge accepted by default, matching common GPU 2D image limits.
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 16384;

pub struct CpuTexture {
    desc: TextureDescriptor,
    data: TexelBuffer,
}

impl DeviceTexture for CpuTexture {
    fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }
}

pub struct CpuKernelHandle {
    entry: String,
    view_count: u32,
    kernel: Arc<dyn CpuKernel>,
}

pub struct CpuDevice {
    max_texture_dimension: u32,
    kernels: HashMap<String, Arc<dyn CpuKernel>>,
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuDevice {
    pub fn new() -> Self {
        let mut kernels: HashMap<String, Arc<dyn CpuKernel>> = HashMap::new();
        kernels.insert(INTERLEAVE_ENTRY.to_string(), Arc::new(LenticularInterleave));
        Self {
            max_texture_dimension: DEFAULT_MAX_TEXTURE_DIMENSION,
            kernels,
        }
    }

    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.max_texture_dimension = max;
        self
    }

    /// Registers an alternative kernel under `entry`, replacing any existing one.
    pub fn with_kernel(mut self, entry: impl Into<String>, kernel: impl CpuKernel + 'static) -> Self {
        self.kernels.insert(entry.into(), Arc::new(kernel));
        self
    }
}

impl ComputeDevice for CpuDevice {
    type Texture = CpuTexture;
    type Kernel = CpuKernelHandle;

    fn name(&self) -> String {
        "cpu (software)".to_string()
    }

    fn create_texture(&self, desc: TextureDescriptor) -> Result<CpuTexture> {
        if desc.width == 0 || desc.height == 0 {
            return Err(QuiltError::DeviceAllocation(format!(
                "{}x{} texture is empty",
                desc.width, desc.height
            )));
        }
        if desc.width > self.max_texture_dimension || desc.height > self.max_texture_dimension {
            return Err(QuiltError::DeviceAllocation(format!(
                "{}x{} exceeds the maximum image dimension {}",
                desc.width, desc.height, self.max_texture_dimension
            )));
        }

        debug!("Allocating {:?} texture {}x{}", desc.format, desc.width, desc.height);
        let data = match desc.format {
            TextureFormat::Rgba8Uint => TexelBuffer::Rgba8(vec![0; desc.byte_size()]),
            TextureFormat::R32Float => TexelBuffer::R32Float(vec![0.0; desc.texel_count()]),
        };
        Ok(CpuTexture { desc, data })
    }

    fn upload_region(&self, texture: &mut CpuTexture, region: Region, pixels: &[u8]) -> Result<()> {
        validate_upload(&texture.desc, region, pixels)?;
        let TexelBuffer::Rgba8(data) = &mut texture.data else {
            return Err(QuiltError::TransferError("texture storage is not RGBA8".to_string()));
        };

        let row_bytes = region.width as usize * 4;
        if row_bytes == 0 {
            return Ok(());
        }
        let pitch = texture.desc.width as usize * 4;
        for (row, src) in pixels.chunks_exact(row_bytes).enumerate() {
            let start = (region.y as usize + row) * pitch + region.x as usize * 4;
            data[start..start + row_bytes].copy_from_slice(src);
        }
        Ok(())
    }

    fn download(&self, texture: &CpuTexture) -> Result<TexelBuffer> {
        Ok(texture.data.clone())
    }

    fn build_kernel(&self, spec: &KernelSpec) -> Result<CpuKernelHandle> {
        let kernel = self.kernels.get(&spec.entry).ok_or_else(|| {
            QuiltError::KernelError(format!("no CPU kernel named `{}`", spec.entry))
        })?;
        Ok(CpuKernelHandle {
            entry: spec.entry.clone(),
            view_count: spec.view_count,
            kernel: Arc::clone(kernel),
        })
    }

    fn dispatch(
        &self,
        kernel: &CpuKernelHandle,
        input: &CpuTexture,
        output: &mut CpuTexture,
        grid: QuiltGrid,
    ) -> Result<()> {
        validate_dispatch(&input.desc, &output.desc)?;
        let TexelBuffer::Rgba8(canvas) = &input.data else {
            return Err(QuiltError::KernelError("kernel input must be RGBA8".to_string()));
        };
        let (tile_width, tile_height) = (output.desc.width, output.desc.height);
        let TexelBuffer::R32Float(result) = &mut output.data else {
            return Err(QuiltError::KernelError("kernel output must be R32F".to_string()));
        };

        debug!(
            "Dispatching `{}` over {}x{} ({} views)",
            kernel.entry, tile_width, tile_height, kernel.view_count
        );
        let invocation = KernelInvocation {
            canvas,
            canvas_width: input.desc.width,
            canvas_height: input.desc.height,
            grid,
        };
        kernel
            .kernel
            .run(&invocation, kernel.view_count, result, tile_width, tile_height)
    }
}
