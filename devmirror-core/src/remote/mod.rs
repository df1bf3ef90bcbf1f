//! TCP-backed device session.
//!
//! ```text
//! DEVICE                                   CLIENT
//! ┌───────────────┐   Hello{name,size}    ┌──────────────────────┐
//! │ encoder       │ ────────────────────► │ reader task          │
//! │               │   Frame / Geometry    │   ↓ (bounded queue)  │
//! │               │ ────────────────────► │ frame-dispatch thread│
//! │               │                       │   ↓ FrameListener    │
//! │ input         │ ◄──────────────────── │ writer task          │
//! └───────────────┘   ControlCommand      └──────────────────────┘
//! ```

pub mod codec;
pub mod session;

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::geometry::Size;

pub use codec::{BincodeCodec, ClientCodec, DeviceCodec, MAX_MESSAGE_SIZE};
pub use session::RemoteSession;

/// Identity and initial geometry announced by the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub size: Size,
}

/// Messages flowing from the device to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceMessage {
    /// First message on every connection.
    Hello(DeviceInfo),
    /// Screen geometry changed (rotation, resolution switch).
    Geometry(Size),
    /// A decoded frame.
    Frame(Frame),
}
