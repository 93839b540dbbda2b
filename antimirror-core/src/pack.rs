//! Indexed bitmap packing.
//!
//! The device transport takes one byte per pixel, `0` for black and `1`
//! for white. This is a representation shim, not compression.

use bytes::Bytes;

use crate::frame::BinaryFrame;

/// A transport-ready bitmap: `width * height` bytes, each 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBitmap {
    pub width: u32,
    pub height: u32,
    /// One byte per pixel, row-major.
    pub data: Bytes,
}

impl IndexedBitmap {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Map a quantized frame to the transport representation: zero stays
/// black, anything else becomes white.
pub fn pack(frame: &BinaryFrame) -> IndexedBitmap {
    let data: Vec<u8> = frame.bits().iter().map(|&b| u8::from(b != 0)).collect();
    IndexedBitmap {
        width: frame.width(),
        height: frame.height(),
        data: Bytes::from(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::quantize::{QuantizationConfig, quantize};

    #[test]
    fn length_matches_pixel_count() {
        for (w, h) in [(1, 1), (4, 4), (400, 240), (7, 3)] {
            let frame = Frame::filled(w, h, [200, 10, 90, 255]).unwrap();
            let bitmap = pack(&quantize(&frame, &QuantizationConfig::default()));
            assert_eq!(bitmap.len(), (w * h) as usize);
            assert!(bitmap.data.iter().all(|&b| b <= 1));
        }
    }

    #[test]
    fn preserves_pixel_order() {
        let bin = BinaryFrame::new(3, 2, vec![1, 0, 0, 1, 1, 0]).unwrap();
        let bitmap = pack(&bin);
        assert_eq!(&bitmap.data[..], &[1, 0, 0, 1, 1, 0]);
        assert_eq!((bitmap.width, bitmap.height), (3, 2));
    }
}
