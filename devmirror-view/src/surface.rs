//! The local backing store for the most recently presented frame.
//!
//! A [`Surface`] has fixed dimensions for its whole life. When a frame
//! of a different size arrives the presenter builds a new surface and
//! swaps the `Arc`, so anyone holding an `Arc<Surface>` always sees a
//! width/height pair that matches its buffer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use devmirror_core::{BYTES_PER_PIXEL, Frame, MirrorError, Size};

/// Region of the surface that needs repainting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    pub const fn full(width: i32, height: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

struct Backing {
    pixels: Vec<u8>,
    dirty: Option<DirtyRect>,
}

/// BGRA8 pixel store of one fixed size.
pub struct Surface {
    width: i32,
    height: i32,
    backing: Mutex<Backing>,
}

impl Surface {
    /// Allocate a zeroed surface. Negative dimensions are clamped to 0.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Self {
            width,
            height,
            backing: Mutex::new(Backing {
                pixels: vec![0u8; len],
                dirty: None,
            }),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Whether `frame` can be copied without reallocating.
    pub fn matches(&self, frame: &Frame) -> bool {
        self.width == frame.width && self.height == frame.height
    }

    /// Copy `frame` into the backing buffer and mark the whole surface
    /// dirty.
    ///
    /// The buffer lock is held only for the copy and released on every
    /// path. A frame whose size or pixel length does not fit is rejected
    /// before any byte is written.
    pub fn write_frame(&self, frame: &Frame) -> Result<DirtyRect, MirrorError> {
        let mut backing = self.lock();
        if !self.matches(frame) || frame.pixels.len() != backing.pixels.len() {
            return Err(MirrorError::FrameSizeMismatch {
                expected: backing.pixels.len(),
                actual: frame.pixels.len(),
            });
        }
        backing.pixels.copy_from_slice(&frame.pixels);
        let rect = DirtyRect::full(self.width, self.height);
        backing.dirty = Some(rect);
        Ok(rect)
    }

    /// Take (and clear) the pending dirty region.
    pub fn take_dirty(&self) -> Option<DirtyRect> {
        self.lock().dirty.take()
    }

    /// Read the pixels under the buffer lock, e.g. to blit them.
    pub fn with_pixels<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.lock().pixels)
    }

    /// Copy of the current pixels.
    pub fn to_vec(&self) -> Vec<u8> {
        self.with_pixels(|pixels| pixels.to_vec())
    }

    fn lock(&self) -> MutexGuard<'_, Backing> {
        self.backing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
