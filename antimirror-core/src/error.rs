//! Domain-specific error types for the mirror pipeline.
//!
//! All fallible operations return `Result<T, MirrorError>`.
//! Per-tick failures never escape the tick loop; they are folded into a
//! [`TickOutcome`](crate::pipeline::TickOutcome) instead.

use thiserror::Error;

/// The canonical error type for the mirror pipeline.
#[derive(Debug, Error)]
pub enum MirrorError {
    // ── Frame Errors ─────────────────────────────────────────────
    /// A pixel buffer does not match its declared dimensions.
    #[error("invalid frame buffer: expected {expected} bytes, got {actual}")]
    InvalidFrameLength { expected: usize, actual: usize },

    /// Width or height is zero (or the product overflows).
    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The capture region has a zero-sized side.
    #[error("invalid capture region: {w}x{h} at ({x}, {y})")]
    InvalidRegion { x: u32, y: u32, w: u32, h: u32 },

    // ── Capture / Preview Errors ─────────────────────────────────
    /// No drawing surface to render into for this tick.
    #[error("drawing surface unavailable")]
    SurfaceUnavailable,

    /// The frame source stopped delivering frames.
    #[error("frame source ended")]
    SourceEnded,

    // ── Device Errors ────────────────────────────────────────────
    /// The device transport reported a failure.
    #[error("device error: {0}")]
    Device(String),

    /// An operation required an open device connection.
    #[error("device not open")]
    DeviceNotOpen,

    // ── State Errors ─────────────────────────────────────────────
    /// A pipeline state transition was requested from the wrong state.
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    // ── Wrapped Errors ───────────────────────────────────────────
    /// The I/O layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for MirrorError {
    fn from(s: String) -> Self {
        MirrorError::Other(s)
    }
}

impl From<&str> for MirrorError {
    fn from(s: &str) -> Self {
        MirrorError::Other(s.to_string())
    }
}
