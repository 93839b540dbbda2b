//! # antimirror-core
//!
//! Mirrors a live pixel feed to a small 1-bit display.
//!
//! This crate contains:
//! - **Frames**: `Frame` (RGBA), `BinaryFrame` (black/white), `CaptureRegion`
//! - **Quantization**: threshold, Bayer 4x4 ordered dither, Floyd–Steinberg
//!   and Atkinson error diffusion, selected by `QuantizationConfig`
//! - **Packing**: `IndexedBitmap`, one byte per pixel for the device transport
//! - **Capture**: `FrameSource` / `PreviewSurface` boundaries and region extraction
//! - **Device**: `DeviceChannel` trait and the `DeviceSlot` holding the attached device
//! - **Pipeline**: `FramePipeline`, the fixed-cadence capture → quantize → send loop
//! - **Error**: `MirrorError` — typed, `thiserror`-based error enum

pub mod capture;
pub mod device;
pub mod error;
pub mod frame;
pub mod pack;
pub mod pipeline;
pub mod quantize;
pub mod throughput;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use capture::{FrameSource, PreviewSurface, extract_region};
pub use device::{DeviceChannel, DeviceEvent, DeviceSlot, DeviceStatus, DeviceVersion, SendResult};
pub use error::MirrorError;
pub use frame::{BinaryFrame, CaptureRegion, DISPLAY_HEIGHT, DISPLAY_WIDTH, Frame};
pub use pack::{IndexedBitmap, pack};
pub use pipeline::{
    FramePipeline, MirrorSettings, PipelineConfig, PipelinePhase, PipelineStats, TickOutcome,
};
pub use quantize::{QuantizationConfig, quantize};
pub use throughput::ThroughputCounter;
