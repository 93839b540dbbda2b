//! # Quantization engine
//!
//! Reduces an RGBA [`Frame`] to a [`BinaryFrame`] using one of four
//! algorithms selected by [`QuantizationConfig`]:
//!
//! | Variant          | Module       | Spatial dependency                |
//! |------------------|--------------|-----------------------------------|
//! | `Threshold`      | `threshold`  | none                              |
//! | `OrderedDither`  | `bayer`      | pixel position modulo 4           |
//! | `FloydSteinberg` | `diffusion`  | error pushed to 4 later pixels    |
//! | `Atkinson`       | `diffusion`  | 6/8 of error pushed to 6 pixels   |
//!
//! Every call is independent: scratch buffers are allocated per call and
//! nothing is retained between frames.

pub mod bayer;
pub mod diffusion;
pub mod threshold;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MirrorError;
use crate::frame::{BinaryFrame, Frame};

/// Threshold used when an algorithm is selected by name only.
pub const DEFAULT_THRESHOLD: u8 = 128;

// ── QuantizationConfig ───────────────────────────────────────────

/// Which quantization algorithm to run, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuantizationConfig {
    /// Plain luminance threshold.
    Threshold { threshold: u8 },
    /// Bayer 4x4 ordered dithering.
    #[serde(alias = "bayer")]
    OrderedDither { threshold: u8 },
    /// Floyd–Steinberg error diffusion.
    FloydSteinberg,
    /// Atkinson error diffusion.
    Atkinson,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        QuantizationConfig::OrderedDither {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl QuantizationConfig {
    /// Stable name of the algorithm, as accepted by [`FromStr`].
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Threshold { .. } => "threshold",
            Self::OrderedDither { .. } => "ordered-dither",
            Self::FloydSteinberg => "floyd-steinberg",
            Self::Atkinson => "atkinson",
        }
    }
}

impl fmt::Display for QuantizationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threshold { threshold } | Self::OrderedDither { threshold } => {
                write!(f, "{} ({threshold})", self.kind())
            }
            Self::FloydSteinberg | Self::Atkinson => f.write_str(self.kind()),
        }
    }
}

impl FromStr for QuantizationConfig {
    type Err = MirrorError;

    /// Parse an algorithm name; thresholded variants get
    /// [`DEFAULT_THRESHOLD`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let threshold = DEFAULT_THRESHOLD;
        match s.trim().to_ascii_lowercase().as_str() {
            "threshold" => Ok(Self::Threshold { threshold }),
            "ordered-dither" | "bayer" => Ok(Self::OrderedDither { threshold }),
            "floyd-steinberg" | "floydsteinberg" => Ok(Self::FloydSteinberg),
            "atkinson" => Ok(Self::Atkinson),
            other => Err(MirrorError::Other(format!(
                "unknown quantization kind: {other}"
            ))),
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────

/// Quantize `frame` to black and white.
pub fn quantize(frame: &Frame, config: &QuantizationConfig) -> BinaryFrame {
    let width = frame.width();
    let whites = match *config {
        QuantizationConfig::Threshold { threshold } => {
            threshold::apply(&luminance(frame), threshold)
        }
        QuantizationConfig::OrderedDither { threshold } => {
            bayer::apply(&luminance(frame), width, threshold)
        }
        QuantizationConfig::FloydSteinberg => {
            diffusion::apply(&diffusion::seeds(frame), width, &diffusion::FLOYD_STEINBERG)
        }
        QuantizationConfig::Atkinson => {
            diffusion::apply(&diffusion::seeds(frame), width, &diffusion::ATKINSON)
        }
    };
    BinaryFrame::from_whites(frame.width(), frame.height(), whites)
}

/// Luminance is carried in thousandths so that the channel weights are
/// exact: `luminance = milli / LUMA_SCALE`.
pub const LUMA_SCALE: u32 = 1000;

/// Weighted grayscale intensity of one pixel in thousandths
/// (`0..=255_000`); alpha is ignored.
#[inline]
pub fn pixel_luminance_milli(r: u8, g: u8, b: u8) -> u32 {
    299 * r as u32 + 587 * g as u32 + 114 * b as u32
}

/// Weighted grayscale intensity of one pixel as a floating-point sum,
/// evaluated red, green, blue in that order. Can be one ulp off the exact
/// value; error diffusion seeds from it.
#[inline]
pub fn pixel_luminance(r: u8, g: u8, b: u8) -> f64 {
    r as f64 * 0.299 + g as f64 * 0.587 + b as f64 * 0.114
}

/// Luminance of every pixel in thousandths, row-major.
pub fn luminance(frame: &Frame) -> Vec<u32> {
    frame
        .rgba_pixels()
        .map(|px| pixel_luminance_milli(px[0], px[1], px[2]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            let v = ((x * 255) / width.max(1)) as u8;
            [v, v.wrapping_add((y * 13) as u8), 255 - v, (x * y) as u8]
        })
        .unwrap()
    }

    fn all_configs() -> [QuantizationConfig; 4] {
        [
            QuantizationConfig::Threshold { threshold: 100 },
            QuantizationConfig::OrderedDither { threshold: 128 },
            QuantizationConfig::FloydSteinberg,
            QuantizationConfig::Atkinson,
        ]
    }

    #[test]
    fn default_is_ordered_dither_128() {
        assert_eq!(
            QuantizationConfig::default(),
            QuantizationConfig::OrderedDither { threshold: 128 }
        );
    }

    #[test]
    fn luminance_weights() {
        assert_eq!(pixel_luminance_milli(0, 0, 0), 0);
        assert_eq!(pixel_luminance_milli(255, 255, 255), 255_000);
        assert_eq!(pixel_luminance_milli(128, 128, 128), 128_000);
        assert!((pixel_luminance(255, 255, 255) - 255.0).abs() < 1e-9);
        assert!((pixel_luminance(100, 0, 0) - 29.9).abs() < 1e-9);
        assert!((pixel_luminance(0, 100, 0) - 58.7).abs() < 1e-9);
        assert!((pixel_luminance(0, 0, 100) - 11.4).abs() < 1e-9);
    }

    #[test]
    fn output_is_binary_and_opaque_for_every_algorithm() {
        let frame = gradient(37, 11);
        for config in all_configs() {
            let out = quantize(&frame, &config);
            assert_eq!(out.bits().len(), 37 * 11);
            assert!(out.bits().iter().all(|&b| b <= 1), "{config}");

            let rgba = out.to_rgba();
            for px in rgba.rgba_pixels() {
                assert!(px[..3].iter().all(|&c| c == 0 || c == 255), "{config}");
                assert_eq!(px[3], 255);
            }
        }
    }

    #[test]
    fn every_algorithm_is_deterministic() {
        let frame = gradient(64, 48);
        for config in all_configs() {
            assert_eq!(quantize(&frame, &config), quantize(&frame, &config));
        }
    }

    #[test]
    fn alpha_does_not_influence_result() {
        let opaque = Frame::from_fn(8, 8, |x, y| [(x * 30) as u8, (y * 30) as u8, 90, 255]).unwrap();
        let clear = Frame::from_fn(8, 8, |x, y| [(x * 30) as u8, (y * 30) as u8, 90, 0]).unwrap();
        for config in all_configs() {
            assert_eq!(quantize(&opaque, &config), quantize(&clear, &config));
        }
    }

    #[test]
    fn mid_gray_threshold_is_all_white() {
        // 0.299 + 0.587 + 0.114 == 1, so gray 128 has luminance exactly 128
        let frame = Frame::filled(4, 4, [128, 128, 128, 255]).unwrap();
        let out = quantize(&frame, &QuantizationConfig::Threshold { threshold: 128 });
        assert_eq!(out.white_count(), 16);
    }

    #[test]
    fn parse_kind_names() {
        assert_eq!(
            "bayer".parse::<QuantizationConfig>().unwrap(),
            QuantizationConfig::OrderedDither { threshold: 128 }
        );
        assert_eq!(
            "Threshold".parse::<QuantizationConfig>().unwrap(),
            QuantizationConfig::Threshold { threshold: 128 }
        );
        assert_eq!(
            "floyd-steinberg".parse::<QuantizationConfig>().unwrap(),
            QuantizationConfig::FloydSteinberg
        );
        assert_eq!(
            "atkinson".parse::<QuantizationConfig>().unwrap(),
            QuantizationConfig::Atkinson
        );
        assert!("sierra".parse::<QuantizationConfig>().is_err());
    }

    #[test]
    fn serde_uses_kind_tag() {
        let json = serde_json::to_string(&QuantizationConfig::Threshold { threshold: 90 }).unwrap();
        assert_eq!(json, r#"{"kind":"threshold","threshold":90}"#);

        let parsed: QuantizationConfig =
            serde_json::from_str(r#"{"kind":"bayer","threshold":140}"#).unwrap();
        assert_eq!(parsed, QuantizationConfig::OrderedDither { threshold: 140 });

        let parsed: QuantizationConfig = serde_json::from_str(r#"{"kind":"atkinson"}"#).unwrap();
        assert_eq!(parsed, QuantizationConfig::Atkinson);
    }

    #[test]
    fn display_includes_threshold() {
        let text = QuantizationConfig::OrderedDither { threshold: 99 }.to_string();
        assert_eq!(text, "ordered-dither (99)");
        assert_eq!(QuantizationConfig::Atkinson.to_string(), "atkinson");
    }
}
