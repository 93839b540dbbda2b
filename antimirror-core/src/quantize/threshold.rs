//! Plain luminance threshold: white when `luminance >= threshold`.

use super::LUMA_SCALE;

/// Per-pixel white decision for luminance values given in thousandths.
pub fn apply(luminance: &[u32], threshold: u8) -> Vec<bool> {
    let cutoff = threshold as u32 * LUMA_SCALE;
    luminance.iter().map(|&lum| lum >= cutoff).collect()
}
