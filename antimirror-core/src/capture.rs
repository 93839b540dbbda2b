//! Frame source and preview boundaries, plus capture-region extraction.
//!
//! The OS screen-capture facility lives outside this crate; it is reached
//! through [`FrameSource`]. Local preview rendering goes through
//! [`PreviewSurface`].

use async_trait::async_trait;
use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::error::MirrorError;
use crate::frame::{CaptureRegion, Frame};

// ── FrameSource ──────────────────────────────────────────────────

/// A live rectangular pixel feed.
#[async_trait]
pub trait FrameSource: Send {
    /// Return the current frame of the feed.
    ///
    /// Returns [`MirrorError::SourceEnded`] once the feed has stopped
    /// (for example when the user revokes screen sharing).
    async fn next_frame(&mut self) -> Result<Frame, MirrorError>;

    /// Release the feed. Called when capture is stopped explicitly.
    async fn stop(&mut self) {}
}

// ── PreviewSurface ───────────────────────────────────────────────

/// Local drawing surface that shows the quantized frame.
pub trait PreviewSurface: Send {
    /// Whether the surface can be drawn on right now.
    fn is_available(&self) -> bool {
        true
    }

    /// Draw a quantized frame.
    fn present(&mut self, frame: &Frame) -> Result<(), MirrorError>;
}

// ── Region extraction ────────────────────────────────────────────

/// Copy `region` out of `source` and scale it to `out_width x out_height`.
///
/// Parts of the region that fall outside the source read as transparent
/// black. Scaling samples the nearest source pixel, no smoothing.
pub fn extract_region(
    source: Frame,
    region: CaptureRegion,
    out_width: u32,
    out_height: u32,
) -> Result<Frame, MirrorError> {
    region.validate()?;
    if out_width == 0 || out_height == 0 {
        return Err(MirrorError::InvalidDimensions {
            width: out_width,
            height: out_height,
        });
    }

    let source = source.into_image();
    let covers_source = region.x == 0
        && region.y == 0
        && region.w == source.width()
        && region.h == source.height();

    let cropped = if covers_source {
        source
    } else {
        let mut canvas = RgbaImage::new(region.w, region.h);
        imageops::replace(&mut canvas, &source, -(region.x as i64), -(region.y as i64));
        canvas
    };

    let scaled = if cropped.dimensions() == (out_width, out_height) {
        cropped
    } else {
        imageops::resize(&cropped, out_width, out_height, FilterType::Nearest)
    };

    Frame::from_image(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_ok, block_on};

    /// Grows brighter on every frame.
    struct Fading(u8);

    #[async_trait]
    impl FrameSource for Fading {
        async fn next_frame(&mut self) -> Result<Frame, MirrorError> {
            self.0 = self.0.saturating_add(100);
            Frame::filled(2, 2, [self.0, self.0, self.0, 255])
        }
    }

    fn numbered(width: u32, height: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| [x as u8, y as u8, 0, 255]).unwrap()
    }

    #[test]
    fn source_frames_feed_region_extraction() {
        let mut source = Fading(0);
        let first = assert_ok!(block_on(source.next_frame()));
        let second = assert_ok!(block_on(source.next_frame()));
        block_on(source.stop());
        assert_eq!(first.pixel(0, 0), [100, 100, 100, 255]);
        assert_eq!(second.pixel(1, 1), [200, 200, 200, 255]);

        let out = assert_ok!(extract_region(second, CaptureRegion::new(0, 0, 2, 2), 4, 4));
        assert!(out.rgba_pixels().all(|px| px == [200, 200, 200, 255]));
    }

    #[test]
    fn crop_without_scaling() {
        let out = extract_region(numbered(10, 8), CaptureRegion::new(2, 3, 4, 2), 4, 2).unwrap();
        assert_eq!((out.width(), out.height()), (4, 2));
        assert_eq!(out.pixel(0, 0), [2, 3, 0, 255]);
        assert_eq!(out.pixel(3, 1), [5, 4, 0, 255]);
    }

    #[test]
    fn region_outside_source_is_transparent_black() {
        let out = extract_region(numbered(4, 4), CaptureRegion::new(2, 2, 4, 4), 4, 4).unwrap();
        assert_eq!(out.pixel(1, 1), [3, 3, 0, 255]);
        assert_eq!(out.pixel(2, 0), [0, 0, 0, 0]);
        assert_eq!(out.pixel(3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn upscale_repeats_pixels() {
        let out = extract_region(numbered(2, 2), CaptureRegion::new(0, 0, 2, 2), 4, 4).unwrap();
        assert_eq!(out.pixel(0, 0), out.pixel(1, 1));
        assert_eq!(out.pixel(2, 2), [1, 1, 0, 255]);
        assert_eq!(out.pixel(3, 0), [1, 0, 0, 255]);
    }

    #[test]
    fn downscale_produces_requested_size() {
        let out = extract_region(numbered(100, 60), CaptureRegion::new(0, 0, 100, 60), 50, 30).unwrap();
        assert_eq!((out.width(), out.height()), (50, 30));
        assert!(out.rgba_pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn rejects_empty_region_and_output() {
        assert!(extract_region(numbered(4, 4), CaptureRegion::new(0, 0, 0, 4), 4, 4).is_err());
        assert!(extract_region(numbered(4, 4), CaptureRegion::new(0, 0, 4, 4), 0, 4).is_err());
    }
}
