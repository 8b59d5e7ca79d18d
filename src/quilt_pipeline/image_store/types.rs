//! Host-side image buffers

/// Every view is forced to RGBA on decode.
pub const VIEW_CHANNELS: u32 = 4;

/// One decoded sub-aperture view (or a whole pre-tiled quilt) in host memory
#[derive(Debug, Clone, PartialEq)]
pub struct ViewImage {
    /// Width of the image in pixels
    pub width: u32,
    /// Height of the image in pixels
    pub height: u32,
    /// Channels per pixel, always [`VIEW_CHANNELS`] after decoding
    pub channels: u32,
    /// RGBA8 pixel data, row-major, top row first
    pub data: Vec<u8>,
}

impl ViewImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels: VIEW_CHANNELS,
            data,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the RGBA value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize * self.width as usize) + x as usize) * VIEW_CHANNELS as usize;
        self.data.get(i..i + 4)?.try_into().ok()
    }
}

/// Single-channel floating point image, the interleaved result of the compute step
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}
