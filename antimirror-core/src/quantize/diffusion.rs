//! Error-diffusion dithering (Floyd–Steinberg and Atkinson).
//!
//! Pixels are visited in row-major order over an 8-bit scratch copy of
//! the luminance. Each pixel is decided against [`CUTOFF`], then the
//! rounding error (divided by the kernel divisor, floored) is added to the
//! kernel's not-yet-visited neighbours. Emitted pixels are never revisited.
//!
//! Neighbour positions are plain index offsets (`row * width + col`) with
//! no padding: a `col` step past the row end wraps into the next row,
//! exactly like the flat-buffer formulation. Writes at or past the end of
//! the buffer are dropped.

use crate::frame::Frame;

/// Scratch values below this are black.
pub const CUTOFF: i32 = 129;

/// One error-diffusion neighbour, relative to the current pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tap {
    /// Rows below the current pixel.
    pub row: u32,
    /// Column offset (may be negative).
    pub col: i32,
    /// Multiplier applied to the floored error.
    pub weight: i32,
}

/// An error-diffusion kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    /// The error is floored after dividing by this.
    pub divisor: i32,
    pub taps: &'static [Tap],
}

impl Kernel {
    /// Sum of all weights; compare with `divisor` for the share of the
    /// error that is redistributed.
    pub fn total_weight(&self) -> i32 {
        self.taps.iter().map(|t| t.weight).sum()
    }
}

const fn tap(row: u32, col: i32, weight: i32) -> Tap {
    Tap { row, col, weight }
}

/// Floyd–Steinberg: 7/16 right, 3/16 below-left, 5/16 below, 1/16
/// below-right.
pub const FLOYD_STEINBERG: Kernel = Kernel {
    divisor: 16,
    taps: &[tap(0, 1, 7), tap(1, -1, 3), tap(1, 0, 5), tap(1, 1, 1)],
};

/// Atkinson: 1/8 to each of six neighbours; the remaining 2/8 is dropped.
pub const ATKINSON: Kernel = Kernel {
    divisor: 8,
    taps: &[
        tap(0, 1, 1),
        tap(0, 2, 1),
        tap(1, -1, 1),
        tap(1, 0, 1),
        tap(1, 1, 1),
        tap(2, 0, 1),
    ],
};

/// Seed value for the 8-bit scratch buffer: the floating-point
/// luminance rounded half to even, clamped to `0..=255`.
///
/// Deliberately not derived from the exact thousandths: a sum that lands
/// one ulp below `.5` must round down here.
pub fn seed(r: u8, g: u8, b: u8) -> u8 {
    super::pixel_luminance(r, g, b).round_ties_even().clamp(0.0, 255.0) as u8
}

/// Scratch seeds of every pixel, row-major; alpha is ignored.
pub fn seeds(frame: &Frame) -> Vec<u8> {
    frame.rgba_pixels().map(|px| seed(px[0], px[1], px[2])).collect()
}

/// Per-pixel white decision over 8-bit scratch seeds, row-major.
pub fn apply(seeds: &[u8], width: u32, kernel: &Kernel) -> Vec<bool> {
    let mut scratch: Vec<i32> = seeds.iter().map(|&v| i32::from(v)).collect();
    let mut whites = Vec::with_capacity(scratch.len());

    for l in 0..scratch.len() {
        let current = scratch[l];
        let value = if current < CUTOFF { 0 } else { 255 };
        let error = (current - value).div_euclid(kernel.divisor);
        whites.push(value == 255);

        if error != 0 {
            diffuse(&mut scratch, l, width, error, kernel);
        }
    }

    whites
}

/// Add `error * weight` to every in-range tap after position `l`.
fn diffuse(scratch: &mut [i32], l: usize, width: u32, error: i32, kernel: &Kernel) {
    let width = width.max(1) as isize;
    let len = scratch.len() as isize;
    for t in kernel.taps {
        let target = l as isize + t.row as isize * width + t.col as isize;
        if target <= l as isize || target >= len {
            continue;
        }
        let slot = &mut scratch[target as usize];
        *slot = (*slot + error * t.weight).clamp(0, 255);
    }
}
