//! Local pointer input → device touch commands.
//!
//! Nothing is remembered between events. Each event re-derives its
//! action from the event kind plus the buttons held at that instant:
//!
//! | Event                         | Command                     |
//! |-------------------------------|-----------------------------|
//! | press, SECONDARY held         | `BackOrScreenOn`            |
//! | press, PRIMARY held           | `Touch(Down)`               |
//! | release of PRIMARY            | `Touch(Up)` (unconditional) |
//! | move, PRIMARY held, x,y >= 0  | `Touch(Move)`               |
//!
//! A primary release emits `Up` even when no `Down` was seen (the press
//! may have started outside the view). Device-side touch handling is
//! expected to ignore a stray `Up`.

use bitflags::bitflags;
use devmirror_core::{ControlCommand, Point, Size, TouchAction};

bitflags! {
    /// Buttons held at the time of an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerButtons: u8 {
        const PRIMARY   = 1 << 0;
        const SECONDARY = 1 << 1;
        const MIDDLE    = 1 << 2;
    }
}

/// A single pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

impl From<PointerButton> for PointerButtons {
    fn from(button: PointerButton) -> Self {
        match button {
            PointerButton::Primary => PointerButtons::PRIMARY,
            PointerButton::Secondary => PointerButtons::SECONDARY,
            PointerButton::Middle => PointerButtons::MIDDLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Pressed,
    Released,
    Moved,
}

/// Pointer input in widget coordinates (origin at the view's top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub x: f64,
    pub y: f64,
    /// Buttons held after this event was applied.
    pub buttons: PointerButtons,
    /// Button that changed state, for press/release.
    pub changed: Option<PointerButton>,
}

impl PointerEvent {
    /// `button` went down; `buttons` already includes it.
    pub fn pressed(button: PointerButton, x: f64, y: f64, buttons: PointerButtons) -> Self {
        Self {
            kind: PointerEventKind::Pressed,
            x,
            y,
            buttons: buttons | PointerButtons::from(button),
            changed: Some(button),
        }
    }

    /// `button` went up; `buttons` no longer includes it.
    pub fn released(button: PointerButton, x: f64, y: f64, buttons: PointerButtons) -> Self {
        Self {
            kind: PointerEventKind::Released,
            x,
            y,
            buttons: buttons - PointerButtons::from(button),
            changed: Some(button),
        }
    }

    pub fn moved(x: f64, y: f64, buttons: PointerButtons) -> Self {
        Self {
            kind: PointerEventKind::Moved,
            x,
            y,
            buttons,
            changed: None,
        }
    }

    /// Position truncated to whole pixels.
    pub fn local_point(&self) -> Point {
        Point::new(self.x as i32, self.y as i32)
    }
}

/// Result of translating one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Translation {
    /// Command to send, if any.
    pub command: Option<ControlCommand>,
    /// Whether the event should be marked handled.
    pub handled: bool,
}

impl Translation {
    pub const IGNORED: Translation = Translation {
        command: None,
        handled: false,
    };

    fn consumed(command: ControlCommand) -> Self {
        Self {
            command: Some(command),
            handled: true,
        }
    }

    fn passthrough(command: ControlCommand) -> Self {
        Self {
            command: Some(command),
            handled: false,
        }
    }
}

/// Converts pointer events into control commands.
#[derive(Debug, Clone, Copy)]
pub struct PointerTranslator {
    forward_pointer: bool,
    back_on_secondary: bool,
}

impl Default for PointerTranslator {
    fn default() -> Self {
        Self {
            forward_pointer: true,
            back_on_secondary: true,
        }
    }
}

impl PointerTranslator {
    pub fn new(forward_pointer: bool, back_on_secondary: bool) -> Self {
        Self {
            forward_pointer,
            back_on_secondary,
        }
    }

    /// Translate `event` given the view's rendered size and the device
    /// geometry. Returns [`Translation::IGNORED`] if either size is empty.
    pub fn translate(&self, event: &PointerEvent, rendered: Size, device: Size) -> Translation {
        if rendered.is_empty() || device.is_empty() {
            return Translation::IGNORED;
        }

        match event.kind {
            PointerEventKind::Pressed => {
                if self.back_on_secondary && event.buttons.contains(PointerButtons::SECONDARY) {
                    return Translation::consumed(ControlCommand::BackOrScreenOn);
                }
                if self.forward_pointer && event.buttons.contains(PointerButtons::PRIMARY) {
                    return Translation::consumed(self.touch(TouchAction::Down, event, rendered, device));
                }
                Translation::IGNORED
            }
            PointerEventKind::Released => {
                if self.forward_pointer && event.changed == Some(PointerButton::Primary) {
                    return Translation::consumed(self.touch(TouchAction::Up, event, rendered, device));
                }
                Translation::IGNORED
            }
            PointerEventKind::Moved => {
                let inside = event.x >= 0.0 && event.y >= 0.0;
                if self.forward_pointer && inside && event.buttons.contains(PointerButtons::PRIMARY) {
                    return Translation::passthrough(self.touch(TouchAction::Move, event, rendered, device));
                }
                Translation::IGNORED
            }
        }
    }

    fn touch(&self, action: TouchAction, event: &PointerEvent, rendered: Size, device: Size) -> ControlCommand {
        let point = scale(event.local_point(), rendered, device);
        ControlCommand::touch(action, point, rendered)
    }
}

/// Map a point from rendered (widget) space to device space.
///
/// `device.x = local.x * device.width / rendered.width`, in integer
/// arithmetic truncating toward zero. A zero `rendered` dimension maps
/// that axis to 0.
pub fn scale(local: Point, rendered: Size, device: Size) -> Point {
    Point::new(
        mul_div(local.x, device.width, rendered.width),
        mul_div(local.y, device.height, rendered.height),
    )
}

/// Map a device point back to the smallest rendered point that
/// [`scale`]s onto or just past it.
pub fn scale_inverse(device_point: Point, rendered: Size, device: Size) -> Point {
    Point::new(
        mul_div_ceil(device_point.x, rendered.width, device.width),
        mul_div_ceil(device_point.y, rendered.height, device.height),
    )
}

fn mul_div(value: i32, num: i32, den: i32) -> i32 {
    let n = i64::from(value) * i64::from(num);
    saturate(n.checked_div(i64::from(den)).unwrap_or(0))
}

fn mul_div_ceil(value: i32, num: i32, den: i32) -> i32 {
    let n = i64::from(value) * i64::from(num);
    saturate((-n).checked_div_euclid(i64::from(den)).map_or(0, |q| -q))
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
