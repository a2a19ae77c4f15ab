//! Decoded image frames.

use image::RgbImage;
use ndarray::{Array3, ArrayView3};

use crate::error::{Error, Result};

/// A decoded frame: `height x width x channels` bytes, row-major, interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array3<u8>,
}

impl Frame {
    /// Wrap a raw interleaved pixel buffer. The buffer length must equal
    /// `width * height * channels` and no dimension may be zero.
    pub fn from_raw(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Result<Self> {
        let shape = (height as usize, width as usize, channels as usize);
        let pixels = Array3::from_shape_vec(shape, data)
            .map_err(|e| Error::invalid_frame(format!("{width}x{height}x{channels}: {e}")))?;
        Self::from_array(pixels)
    }

    pub fn from_array(pixels: Array3<u8>) -> Result<Self> {
        let (h, w, c) = pixels.dim();
        if h == 0 || w == 0 || c == 0 {
            return Err(Error::invalid_frame(format!("empty frame {w}x{h}x{c}")));
        }
        if c > 4 {
            return Err(Error::invalid_frame(format!("unsupported channel count {c}")));
        }
        Ok(Self { pixels })
    }

    /// Decode an encoded image (PNG, JPEG) into an RGB frame.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::invalid_frame(e.to_string()))?
            .to_rgb8();
        Self::from_rgb_image(image)
    }

    pub fn from_rgb_image(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::from_raw(width, height, 3, image.into_raw())
    }

    /// Uniformly coloured RGB frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::from_raw(width, height, 3, data)
    }

    /// Copy into an `image` buffer. Only 3-channel frames convert.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels() != 3 {
            return None;
        }
        let data = self.pixels.iter().copied().collect();
        RgbImage::from_raw(self.width(), self.height(), data)
    }

    pub fn width(&self) -> u32 {
        self.pixels.dim().1 as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.dim().0 as u32
    }

    pub fn channels(&self) -> u32 {
        self.pixels.dim().2 as u32
    }

    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }
}
