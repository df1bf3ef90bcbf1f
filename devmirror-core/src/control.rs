//! Control commands sent from the client to the remote device.
//!
//! ```text
//! Client ──[Touch(Down|Move|Up)]─────────────► Device
//!   point in device space + the rendered size it was scaled from
//!
//! Client ──[BackOrScreenOn]──────────────────► Device
//!   no payload: press BACK, or wake the screen if it is off
//! ```

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Size};

/// Pointer id reported for touches synthesised from a mouse.
pub const POINTER_ID_MOUSE: u64 = u64::MAX;

// ── Touch ─────────────────────────────────────────────────────────

/// Phase of a single-finger contact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TouchAction {
    Down,
    Up,
    Move,
}

impl std::fmt::Display for TouchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TouchAction::Down => write!(f, "down"),
            TouchAction::Up => write!(f, "up"),
            TouchAction::Move => write!(f, "move"),
        }
    }
}

/// A touch sample in device coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub pointer_id: u64,
    /// Position in device space.
    pub point: Point,
    /// Rendered size of the local surface the point was scaled from.
    pub screen_size: Size,
    /// 1.0 while in contact, 0.0 on release.
    pub pressure: f32,
}

impl TouchEvent {
    /// Touch sample from the mouse pointer.
    pub fn new(action: TouchAction, point: Point, screen_size: Size) -> Self {
        let pressure = match action {
            TouchAction::Up => 0.0,
            TouchAction::Down | TouchAction::Move => 1.0,
        };
        Self {
            action,
            pointer_id: POINTER_ID_MOUSE,
            point,
            screen_size,
            pressure,
        }
    }
}

// ── ControlCommand ────────────────────────────────────────────────

/// Everything this client can ask the device to do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ControlCommand {
    Touch(TouchEvent),
    BackOrScreenOn,
}

impl ControlCommand {
    pub fn touch(action: TouchAction, point: Point, screen_size: Size) -> Self {
        ControlCommand::Touch(TouchEvent::new(action, point, screen_size))
    }
}
