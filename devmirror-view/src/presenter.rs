//! Frame presentation: producer thread → rendering loop → surface.
//!
//! ```text
//! frame-dispatch thread               rendering loop
//! ┌──────────────────────┐            ┌───────────────────────────┐
//! │ FramePresenter       │  invoke    │ apply_frame(DisplayState) │
//! │   ::present(frame) ──┼──────────► │   validate                │
//! │   (waits ≤ timeout)  │ ◄──────────┼─  (re)allocate Surface    │
//! └──────────────────────┘  outcome   │   write_frame + dirty     │
//!                                     └───────────────────────────┘
//! ```
//!
//! Every failure here ends in a dropped frame, never in an error for
//! the producer: the next frame supersedes the one that was lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use devmirror_core::{Frame, FrameListener, Size};
use tracing::{debug, trace, warn};

use crate::dispatch::{DispatchError, RenderDispatcher};
use crate::surface::{DirtyRect, Surface};

// ── DisplayState ─────────────────────────────────────────────────

/// State owned by the rendering loop: the attached display target and
/// the surface frames are copied into.
#[derive(Debug, Default)]
pub struct DisplayState {
    surface: Option<Arc<Surface>>,
    target: Option<Size>,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current surface, if a frame has been presented since attach.
    pub fn surface(&self) -> Option<Arc<Surface>> {
        self.surface.clone()
    }

    /// Rendered extent of the attached display, if any.
    pub fn target(&self) -> Option<Size> {
        self.target
    }

    pub fn attach(&mut self, rendered: Size) {
        self.target = Some(rendered);
    }

    /// Record a new rendered extent. Ignored while detached.
    pub fn resize(&mut self, rendered: Size) {
        if self.target.is_some() {
            self.target = Some(rendered);
        }
    }

    /// Drop the target and release the surface.
    pub fn detach(&mut self) {
        self.target = None;
        self.surface = None;
    }
}

// ── PresentOutcome ───────────────────────────────────────────────

/// What happened to one presented frame. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Copied into the surface; the region needs repainting.
    Presented(DirtyRect),
    /// Pixel length did not match the declared dimensions.
    Rejected,
    /// No display is attached.
    NoTarget,
    /// The rendering loop did not get to it in time.
    TimedOut,
    /// The rendering loop is gone.
    Closed,
}

/// Running totals for diagnostics.
#[derive(Debug, Default)]
pub struct PresentStats {
    presented: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`PresentStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentCounts {
    pub presented: u64,
    pub rejected: u64,
    pub dropped: u64,
}

impl PresentStats {
    fn record(&self, outcome: PresentOutcome) {
        let counter = match outcome {
            PresentOutcome::Presented(_) => &self.presented,
            PresentOutcome::Rejected => &self.rejected,
            PresentOutcome::NoTarget | PresentOutcome::TimedOut | PresentOutcome::Closed => {
                &self.dropped
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PresentCounts {
        PresentCounts {
            presented: self.presented.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

// ── FramePresenter ───────────────────────────────────────────────

/// Producer-side entry point. Clone it into whatever thread decodes
/// frames, or subscribe it to a session directly.
#[derive(Clone)]
pub struct FramePresenter {
    dispatcher: RenderDispatcher<DisplayState>,
    timeout: Duration,
    stats: Arc<PresentStats>,
}

impl FramePresenter {
    pub fn new(dispatcher: RenderDispatcher<DisplayState>, timeout: Duration) -> Self {
        Self {
            dispatcher,
            timeout,
            stats: Arc::new(PresentStats::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stats(&self) -> PresentCounts {
        self.stats.snapshot()
    }

    /// Hand `frame` to the rendering loop and wait at most the
    /// configured timeout for it to be copied.
    ///
    /// Callable from any thread. Blocks the caller for no longer than
    /// the timeout.
    pub fn present(&self, frame: Frame) -> PresentOutcome {
        let outcome = match self
            .dispatcher
            .invoke(self.timeout, move |state: &mut DisplayState| apply_frame(state, frame))
        {
            Ok(outcome) => outcome,
            Err(DispatchError::Timeout(after)) => {
                debug!(?after, "rendering loop busy; frame dropped");
                PresentOutcome::TimedOut
            }
            Err(DispatchError::Closed) => {
                debug!("rendering loop closed; frame dropped");
                PresentOutcome::Closed
            }
        };
        self.stats.record(outcome);
        outcome
    }
}

impl FrameListener for FramePresenter {
    fn on_frame(&self, frame: Frame) {
        self.present(frame);
    }
}

/// Rendering-loop half of [`FramePresenter::present`].
///
/// Reallocates the surface only when there is none or the frame size
/// changed. A rejected frame leaves the existing surface untouched.
pub fn apply_frame(state: &mut DisplayState, frame: Frame) -> PresentOutcome {
    if let Err(e) = frame.validate() {
        warn!("rejecting frame: {e}");
        return PresentOutcome::Rejected;
    }
    if state.target.is_none() {
        trace!("no display attached; frame dropped");
        return PresentOutcome::NoTarget;
    }

    let surface = match &state.surface {
        Some(surface) if surface.matches(&frame) => Arc::clone(surface),
        _ => {
            debug!(size = %frame.size(), "allocating surface");
            let surface = Arc::new(Surface::new(frame.width, frame.height));
            state.surface = Some(Arc::clone(&surface));
            surface
        }
    };

    match surface.write_frame(&frame) {
        Ok(rect) => PresentOutcome::Presented(rect),
        Err(e) => {
            warn!("frame copy failed: {e}");
            PresentOutcome::Rejected
        }
    }
}
