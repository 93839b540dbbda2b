//! Frame types shared across the pipeline stages.
//!
//! [`Frame`] is the RGBA input (and preview output) of the quantizer,
//! [`BinaryFrame`] its one-byte-per-pixel black/white result.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Width of the target monochrome display.
pub const DISPLAY_WIDTH: u32 = 400;

/// Height of the target monochrome display.
pub const DISPLAY_HEIGHT: u32 = 240;

fn pixel_count(width: u32, height: u32) -> Result<usize, MirrorError> {
    if width == 0 || height == 0 {
        return Err(MirrorError::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(MirrorError::InvalidDimensions { width, height })
}

// ── Frame ────────────────────────────────────────────────────────

/// An RGBA frame, row-major with a top-left origin.
///
/// The buffer always holds exactly `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap an existing RGBA buffer, validating its length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, MirrorError> {
        let expected = pixel_count(width, height)? * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(MirrorError::InvalidFrameLength {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, MirrorError> {
        let count = pixel_count(width, height)?;
        let pixels = rgba.iter().copied().cycle().take(count * BYTES_PER_PIXEL).collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Result<Self, MirrorError>
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        let count = pixel_count(width, height)?;
        let mut pixels = Vec::with_capacity(count * BYTES_PER_PIXEL);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (`width * height`).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw RGBA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the RGBA bytes at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        ]
    }

    /// Iterate over pixels in row-major order.
    pub fn rgba_pixels(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.pixels.chunks_exact(BYTES_PER_PIXEL)
    }

    /// Convert into an `image` buffer without copying.
    pub fn into_image(self) -> RgbaImage {
        // Length was validated on construction.
        RgbaImage::from_raw(self.width, self.height, self.pixels)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    /// Take ownership of an `image` buffer.
    pub fn from_image(image: RgbaImage) -> Result<Self, MirrorError> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }
}

// ── BinaryFrame ──────────────────────────────────────────────────

/// Quantizer output: one byte per pixel, each exactly `0` (black) or
/// `1` (white).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFrame {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl BinaryFrame {
    /// Build from a per-pixel white/black decision list.
    pub(crate) fn from_whites(width: u32, height: u32, whites: impl IntoIterator<Item = bool>) -> Self {
        let bits: Vec<u8> = whites.into_iter().map(u8::from).collect();
        debug_assert_eq!(bits.len(), width as usize * height as usize);
        Self {
            width,
            height,
            bits,
        }
    }

    /// Wrap an existing 0/1 buffer, validating length and contents.
    pub fn new(width: u32, height: u32, bits: Vec<u8>) -> Result<Self, MirrorError> {
        let expected = pixel_count(width, height)?;
        if bits.len() != expected {
            return Err(MirrorError::InvalidFrameLength {
                expected,
                actual: bits.len(),
            });
        }
        if bits.iter().any(|&b| b > 1) {
            return Err(MirrorError::Other("binary frame values must be 0 or 1".into()));
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// One byte per pixel, row-major.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Whether the pixel at `(x, y)` is white.
    pub fn is_white(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize] == 1
    }

    /// Number of white pixels.
    pub fn white_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }

    /// Render back to RGBA for preview: channels are 0 or 255, alpha is
    /// always opaque.
    pub fn to_rgba(&self) -> Frame {
        let mut pixels = Vec::with_capacity(self.bits.len() * BYTES_PER_PIXEL);
        for &bit in &self.bits {
            let v = if bit == 0 { 0 } else { 255 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
        Frame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

// ── CaptureRegion ────────────────────────────────────────────────

/// Rectangle of the live source that is mirrored to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl CaptureRegion {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Reject zero-sized regions.
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.w == 0 || self.h == 0 {
            return Err(MirrorError::InvalidRegion {
                x: self.x,
                y: self.y,
                w: self.w,
                h: self.h,
            });
        }
        Ok(())
    }
}

impl Default for CaptureRegion {
    /// Offset of the display inside the desktop simulator window.
    fn default() -> Self {
        Self::new(16, 15, DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}
