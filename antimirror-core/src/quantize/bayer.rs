//! Bayer 4x4 ordered dithering.
//!
//! Each pixel's luminance is averaged with a fixed bias taken from
//! [`BAYER_4X4`] at `[x % 4][y % 4]` before thresholding. The result only
//! depends on the pixel value and its position modulo 4.

use super::LUMA_SCALE;

/// Bias matrix, indexed as `BAYER_4X4[x % 4][y % 4]`.
pub const BAYER_4X4: [[u32; 4]; 4] = [
    [15, 135, 45, 165],
    [195, 75, 225, 105],
    [60, 180, 30, 150],
    [240, 120, 210, 90],
];

/// Bias applied at pixel `(x, y)`.
#[inline]
pub fn bias(x: u32, y: u32) -> u32 {
    BAYER_4X4[(x % 4) as usize][(y % 4) as usize]
}

/// Per-pixel white decision; `luminance` is row-major in thousandths.
pub fn apply(luminance: &[u32], width: u32, threshold: u8) -> Vec<bool> {
    let width = width.max(1) as usize;
    luminance
        .iter()
        .enumerate()
        .map(|(i, &lum)| {
            let x = (i % width) as u32;
            let y = (i / width) as u32;
            // floor((luminance + bias) / 2)
            let biased = (lum + bias(x, y) * LUMA_SCALE) / (2 * LUMA_SCALE);
            biased >= threshold as u32
        })
        .collect()
}
