//! Frame sources for the runner.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use antimirror_core::{Frame, FrameSource, MirrorError};

// ── TestPatternSource ────────────────────────────────────────────

/// Gradient bars that scroll a few pixels every frame.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_number: u64,
}

impl TestPatternSource {
    /// Scroll distance per frame, in pixels.
    const STEP: u64 = 4;

    pub fn new(width: u32, height: u32) -> Result<Self, MirrorError> {
        if width == 0 || height == 0 {
            return Err(MirrorError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            frame_number: 0,
        })
    }
}

#[async_trait]
impl FrameSource for TestPatternSource {
    async fn next_frame(&mut self) -> Result<Frame, MirrorError> {
        let (width, height) = (self.width, self.height);
        let offset = (self.frame_number * Self::STEP % width as u64) as u32;
        self.frame_number += 1;

        Frame::from_fn(width, height, |x, y| {
            let shade = ((x + offset) % width * 255 / width) as u8;
            let band = (y * 255 / height) as u8;
            [shade, band, 255 - shade, 255]
        })
    }
}

// ── ImageFileSource ──────────────────────────────────────────────

/// A still image served unchanged on every tick.
pub struct ImageFileSource {
    frame: Frame,
}

impl ImageFileSource {
    /// Decode the image at `path`.
    pub fn open(path: &Path) -> Result<Self, MirrorError> {
        let image = image::open(path)?.to_rgba8();
        info!(
            "loaded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self {
            frame: Frame::from_image(image)?,
        })
    }
}

#[async_trait]
impl FrameSource for ImageFileSource {
    async fn next_frame(&mut self) -> Result<Frame, MirrorError> {
        Ok(self.frame.clone())
    }
}
