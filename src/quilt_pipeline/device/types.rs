//! Device texture and kernel descriptors

use crate::quilt_pipeline::common::error::{QuiltError, Result};

/// Texel layout of a device texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 4 x 8-bit unsigned channels (the tiled input quilt)
    Rgba8Uint,
    /// 1 x 32-bit float channel (the interleaved result)
    R32Float,
}

impl TextureFormat {
    pub fn bytes_per_texel(&self) -> usize {
        match self {
            TextureFormat::Rgba8Uint => 4,
            TextureFormat::R32Float => 4,
        }
    }
}

/// How kernels may touch a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureAccess {
    KernelRead,
    KernelWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub access: TextureAccess,
}

impl TextureDescriptor {
    /// Canvas-sized RGBA8 quilt texture read by the kernel
    pub fn quilt(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Uint,
            access: TextureAccess::KernelRead,
        }
    }

    /// Tile-sized R32F texture written by the kernel
    pub fn native(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::R32Float,
            access: TextureAccess::KernelWrite,
        }
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn byte_size(&self) -> usize {
        self.texel_count() * self.format.bytes_per_texel()
    }
}

/// Sub-rectangle of a texture, in texels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn full(desc: &TextureDescriptor) -> Self {
        Self {
            x: 0,
            y: 0,
            width: desc.width,
            height: desc.height,
        }
    }

    pub fn fits_within(&self, desc: &TextureDescriptor) -> bool {
        let right = self.x as u64 + self.width as u64;
        let bottom = self.y as u64 + self.height as u64;
        right <= desc.width as u64 && bottom <= desc.height as u64
    }
}

/// Host copy of a whole texture
#[derive(Debug, Clone, PartialEq)]
pub enum TexelBuffer {
    Rgba8(Vec<u8>),
    R32Float(Vec<f32>),
}

impl TexelBuffer {
    pub fn into_rgba8(self) -> Result<Vec<u8>> {
        match self {
            TexelBuffer::Rgba8(data) => Ok(data),
            TexelBuffer::R32Float(_) => Err(QuiltError::TransferError(
                "expected an RGBA8 texture, got R32F".to_string(),
            )),
        }
    }

    pub fn into_r32f(self) -> Result<Vec<f32>> {
        match self {
            TexelBuffer::R32Float(data) => Ok(data),
            TexelBuffer::Rgba8(_) => Err(QuiltError::TransferError(
                "expected an R32F texture, got RGBA8".to_string(),
            )),
        }
    }
}

/// Compute kernel to build for a device.
///
/// `view_count` is baked into the kernel at build time (a `-D` define for CUDA,
/// a field of the CPU kernel) rather than passed per dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSpec {
    pub entry: String,
    pub view_count: u32,
}

/// Checks an RGBA8 upload against the target texture before any copy happens.
pub(crate) fn validate_upload(desc: &TextureDescriptor, region: Region, pixels: &[u8]) -> Result<()> {
    if desc.access != TextureAccess::KernelRead {
        return Err(QuiltError::TransferError(format!(
            "cannot upload into a {:?} texture",
            desc.access
        )));
    }
    if desc.format != TextureFormat::Rgba8Uint {
        return Err(QuiltError::TransferError(format!(
            "cannot upload RGBA8 pixels into a {:?} texture",
            desc.format
        )));
    }
    if !region.fits_within(desc) {
        return Err(QuiltError::TransferError(format!(
            "region {}x{} at ({}, {}) exceeds {}x{} texture",
            region.width, region.height, region.x, region.y, desc.width, desc.height
        )));
    }
    let expected = region.width as usize * region.height as usize * desc.format.bytes_per_texel();
    if pixels.len() != expected {
        return Err(QuiltError::TransferError(format!(
            "region {}x{} needs {} bytes, got {}",
            region.width,
            region.height,
            expected,
            pixels.len()
        )));
    }
    Ok(())
}

/// Checks that a dispatch reads a kernel-readable quilt and writes a kernel-writable result.
pub(crate) fn validate_dispatch(input: &TextureDescriptor, output: &TextureDescriptor) -> Result<()> {
    if input.access != TextureAccess::KernelRead || input.format != TextureFormat::Rgba8Uint {
        return Err(QuiltError::KernelError(format!(
            "kernel input must be a readable RGBA8 texture, got {:?} {:?}",
            input.access, input.format
        )));
    }
    if output.access != TextureAccess::KernelWrite || output.format != TextureFormat::R32Float {
        return Err(QuiltError::KernelError(format!(
            "kernel output must be a writable R32F texture, got {:?} {:?}",
            output.access, output.format
        )));
    }
    Ok(())
}
