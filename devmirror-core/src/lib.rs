//! # devmirror-core
//!
//! Core library for the devmirror remote-device mirroring client.
//!
//! This crate contains:
//! - **Frames**: `Frame`, the immutable BGRA8 picture handed from the decoder
//! - **Geometry**: `Point` / `Size` in widget or device space
//! - **Control**: `ControlCommand` (`Touch` / `BackOrScreenOn`) sent to the device
//! - **Session**: `DeviceSession` / `FrameListener` collaborator traits and
//!   the in-process `ChannelSession`
//! - **Remote**: `RemoteSession` over TCP with a length-prefixed bincode codec
//! - **Error**: `MirrorError`, a typed, `thiserror`-based error hierarchy

pub mod control;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod remote;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use control::{ControlCommand, POINTER_ID_MOUSE, TouchAction, TouchEvent};
pub use error::MirrorError;
pub use frame::{BYTES_PER_PIXEL, Frame};
pub use geometry::{Point, Size};
pub use remote::RemoteSession;
pub use session::{ChannelSession, DeviceSession, FrameListener, ListenerSet, SubscriptionId};
