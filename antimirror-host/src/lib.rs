//! # antimirror-host — console runner
//!
//! Loads a TOML configuration, wires a frame source, an optional PNG
//! preview and a device into an [`antimirror_core::FramePipeline`], and
//! runs it until stopped.
//!
//! ## Collaborators
//!
//! - **Sources**: an animated test pattern or a still image file.
//! - **Device**: a simulated display that stays busy for a fixed transfer
//!   time after every frame.
//! - **Preview**: the latest quantized frame written as PNG.

pub mod config;
pub mod device;
pub mod preview;
pub mod service;
pub mod sources;
