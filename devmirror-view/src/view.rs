//! [`MirrorView`]: the on-screen mirror of one device session.
//!
//! Owned by the rendering loop. It ties together the frame presenter
//! (frames in), the pointer translator (commands out), and whichever
//! session is currently bound.

use std::sync::Arc;
use std::time::Duration;

use devmirror_core::{DeviceSession, Size, SubscriptionId};
use tracing::{debug, info, trace};

use crate::config::ViewConfig;
use crate::dispatch::{RenderQueue, render_channel};
use crate::presenter::{DisplayState, FramePresenter, PresentCounts};
use crate::surface::{DirtyRect, Surface};
use crate::translator::{PointerEvent, PointerTranslator};

struct Binding {
    session: Arc<dyn DeviceSession>,
    subscription: SubscriptionId,
}

/// Display + input bridge for one device.
pub struct MirrorView {
    queue: RenderQueue<DisplayState>,
    state: DisplayState,
    presenter: FramePresenter,
    translator: PointerTranslator,
    binding: Option<Binding>,
}

impl MirrorView {
    pub fn new(present_timeout: Duration, translator: PointerTranslator) -> Self {
        let (dispatcher, queue) = render_channel();
        Self {
            queue,
            state: DisplayState::new(),
            presenter: FramePresenter::new(dispatcher, present_timeout),
            translator,
            binding: None,
        }
    }

    pub fn from_config(config: &ViewConfig) -> Self {
        Self::new(
            config.present_timeout(),
            PointerTranslator::new(config.input.forward_pointer, config.input.back_on_secondary),
        )
    }

    /// A producer handle for feeding frames from another thread.
    pub fn presenter(&self) -> FramePresenter {
        self.presenter.clone()
    }

    pub fn present_stats(&self) -> PresentCounts {
        self.presenter.stats()
    }

    // ── Session binding ──────────────────────────────────────────

    /// Replace the bound session.
    ///
    /// The old session (if any) is unsubscribed, then the new one (if
    /// any) is subscribed, each exactly once. Binding the session that
    /// is already bound does nothing.
    pub fn bind_session(&mut self, session: Option<Arc<dyn DeviceSession>>) {
        let unchanged = match (&self.binding, &session) {
            (Some(bound), Some(new)) => same_session(&bound.session, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        self.on_detach();
        if let Some(session) = session {
            self.on_attach(session);
        }
    }

    /// Subscribe the presenter to `session` and route input to it.
    /// Detaches any previously bound session first.
    pub fn on_attach(&mut self, session: Arc<dyn DeviceSession>) {
        self.on_detach();
        let listener = Arc::new(self.presenter.clone());
        let subscription = session.subscribe(listener);
        info!(device_size = %session.device_size(), "session attached");
        self.binding = Some(Binding {
            session,
            subscription,
        });
    }

    /// Unsubscribe from the bound session, if any.
    pub fn on_detach(&mut self) {
        if let Some(binding) = self.binding.take() {
            binding.session.unsubscribe(binding.subscription);
            debug!("session detached");
        }
    }

    pub fn session(&self) -> Option<&Arc<dyn DeviceSession>> {
        self.binding.as_ref().map(|b| &b.session)
    }

    // ── Display target ───────────────────────────────────────────

    /// The view is now on screen with the given rendered extent.
    pub fn attach_display(&mut self, rendered: Size) {
        debug!(%rendered, "display attached");
        self.state.attach(rendered);
    }

    /// Layout changed the rendered extent.
    pub fn resize_display(&mut self, rendered: Size) {
        trace!(%rendered, "display resized");
        self.state.resize(rendered);
    }

    /// The view left the screen. Releases the surface.
    pub fn detach_display(&mut self) {
        debug!("display detached");
        self.state.detach();
    }

    // ── Rendering loop ───────────────────────────────────────────

    /// Apply frames queued by producers. Call once per loop iteration.
    pub fn pump(&mut self) -> usize {
        self.queue.pump(&mut self.state)
    }

    /// Like [`pump`](Self::pump) but waits up to `wait` for a frame.
    pub fn pump_timeout(&mut self, wait: Duration) -> usize {
        self.queue.pump_timeout(&mut self.state, wait)
    }

    pub fn surface(&self) -> Option<Arc<Surface>> {
        self.state.surface()
    }

    /// Region to repaint since the last call, if any.
    pub fn take_dirty(&self) -> Option<DirtyRect> {
        self.state.surface()?.take_dirty()
    }

    // ── Input ────────────────────────────────────────────────────

    /// Translate and send one pointer event. Returns whether the event
    /// was handled. Without an attached display or a bound session this
    /// is a no-op.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        let Some(rendered) = self.state.target() else {
            return false;
        };
        let Some(binding) = &self.binding else {
            return false;
        };

        let device = binding.session.device_size();
        let translation = self.translator.translate(event, rendered, device);
        if let Some(command) = translation.command {
            trace!(?command, "sending control command");
            binding.session.send_control(command);
        }
        translation.handled
    }
}

impl Drop for MirrorView {
    fn drop(&mut self) {
        self.on_detach();
    }
}

fn same_session(a: &Arc<dyn DeviceSession>, b: &Arc<dyn DeviceSession>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
