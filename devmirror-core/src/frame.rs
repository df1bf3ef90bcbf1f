//! Decoded video frames as handed to the presentation pipeline.
//!
//! A [`Frame`] is produced once per decoded picture and is immutable.
//! Pixels are tightly packed BGRA8 rows (no stride padding), so a valid
//! frame always carries exactly `width * height * 4` bytes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::MirrorError;
use crate::geometry::Size;

/// Bytes per pixel of the fixed BGRA8 layout.
pub const BYTES_PER_PIXEL: usize = 4;

/// One decoded image from the remote device's video stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: i32,
    /// Frame height in pixels.
    pub height: i32,
    /// BGRA8 pixel data, `width * height * 4` bytes when valid.
    pub pixels: Bytes,
}

impl Frame {
    pub fn new(width: i32, height: i32, pixels: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// A frame of the given size filled with one BGRA colour.
    pub fn solid(width: i32, height: i32, bgra: [u8; 4]) -> Self {
        let mut frame = Self::new(width, height, Bytes::new());
        // Dimensions with no representable length get an empty buffer,
        // which `validate` then rejects.
        let len = frame.expected_len().unwrap_or(0);
        frame.pixels = bgra.iter().copied().cycle().take(len).collect::<Vec<u8>>().into();
        frame
    }

    /// Dimensions as a [`Size`].
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Byte length the pixel buffer must have, or `None` if the declared
    /// dimensions are negative or overflow `usize`.
    pub fn expected_len(&self) -> Option<usize> {
        let w = usize::try_from(self.width).ok()?;
        let h = usize::try_from(self.height).ok()?;
        w.checked_mul(h)?.checked_mul(BYTES_PER_PIXEL)
    }

    /// Check that the pixel buffer matches the declared dimensions.
    pub fn validate(&self) -> Result<(), MirrorError> {
        let expected = self.expected_len().ok_or(MirrorError::InvalidDimensions {
            width: self.width,
            height: self.height,
        })?;
        if self.pixels.len() != expected {
            return Err(MirrorError::FrameSizeMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_frame() {
        let f = Frame::solid(4, 2, [1, 2, 3, 255]);
        assert_eq!(f.pixels.len(), 32);
        assert_eq!(&f.pixels[4..8], &[1, 2, 3, 255]);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn short_buffer_is_rejected() {
        let f = Frame::new(4, 2, vec![0u8; 31]);
        match f.validate() {
            Err(MirrorError::FrameSizeMismatch { expected, actual }) => {
                assert_eq!(expected, 32);
                assert_eq!(actual, 31);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn negative_dimensions_are_rejected() {
        let f = Frame::new(-4, 2, Vec::new());
        assert!(f.expected_len().is_none());
        assert!(matches!(
            f.validate(),
            Err(MirrorError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn solid_with_unrepresentable_size_is_empty_and_invalid() {
        #[cfg(target_pointer_width = "32")]
        {
            let f = Frame::solid(i32::MAX, i32::MAX, [1, 1, 1, 1]);
            assert!(f.pixels.is_empty());
            assert!(f.validate().is_err());
        }
        let f = Frame::solid(-3, 5, [1, 1, 1, 1]);
        assert!(f.pixels.is_empty());
        assert!(f.validate().is_err());
    }

    #[test]
    fn zero_sized_frame_is_valid() {
        let f = Frame::new(0, 10, Vec::new());
        assert!(f.validate().is_ok());
    }
}
