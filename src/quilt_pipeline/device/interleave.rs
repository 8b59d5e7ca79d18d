//! Reference lenticular interleave, shared by the CPU device and mirrored by
//! `src/cuda/kernels/quilt_interleave.cu`.
//!
//! Each output texel picks one view along a slanted lens line (one view step per
//! column, shifted by one per row from the bottom) and stores the Rec. 709 luma
//! of that view's texel at the same tile position.

use crate::quilt_pipeline::common::error::{QuiltError, Result};
use crate::quilt_pipeline::layout::QuiltGrid;

/// Entry point name of the reference kernel on every backend.
pub const INTERLEAVE_ENTRY: &str = "quilt_interleave";

const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Inputs of one CPU kernel dispatch
pub struct KernelInvocation<'a> {
    /// RGBA8 canvas texels, row-major
    pub canvas: &'a [u8],
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub grid: QuiltGrid,
}

/// A compute kernel runnable by [`CpuDevice`](super::CpuDevice).
pub trait CpuKernel: Send + Sync {
    /// Fills `output` (`tile_width * tile_height` texels) for one invocation.
    fn run(
        &self,
        invocation: &KernelInvocation<'_>,
        view_count: u32,
        output: &mut [f32],
        tile_width: u32,
        tile_height: u32,
    ) -> Result<()>;
}

/// View shown at output texel `(x, y)` of a `tile_height` tall tile.
pub fn view_for_texel(x: u32, y: u32, tile_height: u32, view_count: u32) -> u32 {
    let from_bottom = tile_height - 1 - y;
    ((x as u64 + from_bottom as u64) % view_count as u64) as u32
}

pub struct LenticularInterleave;

impl CpuKernel for LenticularInterleave {
    fn run(
        &self,
        invocation: &KernelInvocation<'_>,
        view_count: u32,
        output: &mut [f32],
        tile_width: u32,
        tile_height: u32,
    ) -> Result<()> {
        let grid = invocation.grid;
        if view_count == 0 || view_count > grid.view_count() {
            return Err(QuiltError::KernelError(format!(
                "kernel built for {view_count} views cannot sample a {grid} quilt"
            )));
        }
        if tile_width * grid.cols() > invocation.canvas_width
            || tile_height * grid.rows() > invocation.canvas_height
        {
            return Err(QuiltError::KernelError(format!(
                "{tile_width}x{tile_height} tiles overflow the {}x{} canvas",
                invocation.canvas_width, invocation.canvas_height
            )));
        }

        let canvas_width = invocation.canvas_width as usize;
        for y in 0..tile_height {
            for x in 0..tile_width {
                let view = view_for_texel(x, y, tile_height, view_count);
                let column = view % grid.cols();
                let row = grid.rows() - 1 - view / grid.cols();
                let cx = (column * tile_width + x) as usize;
                let cy = (row * tile_height + y) as usize;
                let texel = (cy * canvas_width + cx) * 4;
                let rgb = &invocation.canvas[texel..texel + 3];
                let luma: f32 = rgb
                    .iter()
                    .zip(LUMA)
                    .map(|(&c, w)| c as f32 / 255.0 * w)
                    .sum();
                output[(y * tile_width + x) as usize] = luma;
            }
        }
        Ok(())
    }
}
