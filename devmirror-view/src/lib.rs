//! # devmirror-view: remote device viewer
//!
//! Receives decoded frames from a device session, presents them on the
//! rendering loop's surface, and turns local pointer input into device
//! touch / back commands.
//!
//! | Module       | Purpose                                             |
//! |--------------|-----------------------------------------------------|
//! | `dispatch`   | Bounded-wait hand-off from producer threads to the rendering loop |
//! | `surface`    | Fixed-size BGRA backing store with a scoped copy lock |
//! | `presenter`  | `FramePresenter`: frame → surface, drop on timeout   |
//! | `translator` | Pointer events → scaled `ControlCommand`s            |
//! | `view`       | `MirrorView`: session binding, display target, input |
//! | `window` / `display` | Win32 window and GDI painter used by the binary |

pub mod config;
pub mod dispatch;
pub mod display;
pub mod presenter;
pub mod surface;
pub mod translator;
pub mod view;
pub mod window;

pub use dispatch::{DispatchError, RenderDispatcher, RenderQueue, render_channel};
pub use presenter::{DisplayState, FramePresenter, PresentOutcome};
pub use surface::{DirtyRect, Surface};
pub use translator::{PointerButton, PointerButtons, PointerEvent, PointerTranslator};
pub use view::MirrorView;
