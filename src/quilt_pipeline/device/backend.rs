use crate::quilt_pipeline::common::error::Result;
use crate::quilt_pipeline::device::types::{KernelSpec, Region, TexelBuffer, TextureDescriptor};
use crate::quilt_pipeline::layout::QuiltGrid;

pub trait DeviceTexture {
    fn descriptor(&self) -> &TextureDescriptor;
}

/// A compute context with its queue.
///
/// Every operation is synchronous: it returns only once the device has
/// finished. Textures and kernels release their device memory when dropped.
pub trait ComputeDevice {
    type Texture: DeviceTexture;
    type Kernel;

    fn name(&self) -> String;

    fn create_texture(&self, desc: TextureDescriptor) -> Result<Self::Texture>;

    /// Writes tightly packed RGBA8 `pixels` into `region` of `texture`.
    fn upload_region(&self, texture: &mut Self::Texture, region: Region, pixels: &[u8]) -> Result<()>;

    /// Reads back the whole texture, sized from its own descriptor.
    fn download(&self, texture: &Self::Texture) -> Result<TexelBuffer>;

    fn build_kernel(&self, spec: &KernelSpec) -> Result<Self::Kernel>;

    /// Runs `kernel` once per texel of `output`.
    fn dispatch(
        &self,
        kernel: &Self::Kernel,
        input: &Self::Texture,
        output: &mut Self::Texture,
        grid: QuiltGrid,
    ) -> Result<()>;
}
