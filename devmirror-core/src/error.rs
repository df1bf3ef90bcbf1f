//! Domain-specific error types for the mirroring client.
//!
//! All fallible operations return `Result<T, MirrorError>`.
//! Nothing in the presentation or input path panics on bad input; a
//! bad frame or a lost command is reported here and then dropped.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for devmirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    // ── Frame Errors ─────────────────────────────────────────────
    /// The pixel buffer length does not match `width * height * 4`.
    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    /// Negative or overflowing frame dimensions.
    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    // ── Wire Errors ──────────────────────────────────────────────
    /// A message exceeds the codec limit.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The device did not follow the connection handshake.
    #[error("handshake failed: {0}")]
    Handshake(&'static str),

    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

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

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for MirrorError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        MirrorError::ChannelClosed
    }
}

impl From<Box<bincode::ErrorKind>> for MirrorError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        MirrorError::Encoding(e.to_string())
    }
}
