//! Session collaborator interfaces.
//!
//! A [`DeviceSession`] is whatever connects the client to one remote
//! device: it publishes decoded frames to subscribed
//! [`FrameListener`]s, reports the device's screen geometry, and accepts
//! outbound [`ControlCommand`]s. The view layer only ever talks to a
//! session through this trait.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::control::ControlCommand;
use crate::frame::Frame;
use crate::geometry::Size;

/// Receives every frame a session decodes.
///
/// Called on the session's producer thread, never on the caller's
/// rendering context.
pub trait FrameListener: Send + Sync {
    fn on_frame(&self, frame: Frame);
}

/// Handle returned by [`DeviceSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// A live connection to one remote device.
pub trait DeviceSession: Send + Sync {
    /// Current logical screen size of the device.
    fn device_size(&self) -> Size;

    /// Queue a command for the device. Fire-and-forget.
    fn send_control(&self, command: ControlCommand);

    /// Start delivering frames to `listener`.
    fn subscribe(&self, listener: Arc<dyn FrameListener>) -> SubscriptionId;

    /// Stop delivering frames for `id`. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

// ── ListenerSet ───────────────────────────────────────────────────

/// Subscriber registry shared by the session implementations.
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<SubscriptionId, Arc<dyn FrameListener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn FrameListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, listener);
        trace!(?id, "frame listener subscribed");
        id
    }

    pub fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        trace!(?id, removed, "frame listener unsubscribed");
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `frame` to every listener, in subscription order.
    ///
    /// The registry lock is not held during callbacks, so a listener may
    /// block (presenters wait on their rendering context) or unsubscribe
    /// itself.
    pub fn notify(&self, frame: &Frame) {
        let listeners: Vec<Arc<dyn FrameListener>> = self.lock().values().cloned().collect();
        for listener in listeners {
            listener.on_frame(frame.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<SubscriptionId, Arc<dyn FrameListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── ChannelSession ────────────────────────────────────────────────

/// In-process session: frames are published by the caller and control
/// commands land on a tokio channel.
///
/// Used for local playback, for tests, and as the glue when the frame
/// producer lives in the same process.
pub struct ChannelSession {
    device_size: RwLock<Size>,
    listeners: ListenerSet,
    control_tx: mpsc::UnboundedSender<ControlCommand>,
}

impl ChannelSession {
    /// Create a session and the receiver its control commands go to.
    pub fn new(device_size: Size) -> (Self, mpsc::UnboundedReceiver<ControlCommand>) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let session = Self {
            device_size: RwLock::new(device_size),
            listeners: ListenerSet::new(),
            control_tx,
        };
        (session, control_rx)
    }

    /// Publish a frame to all subscribers on the calling thread.
    pub fn publish_frame(&self, frame: Frame) {
        self.listeners.notify(&frame);
    }

    /// Change the reported geometry (e.g. after a device rotation).
    pub fn set_device_size(&self, size: Size) {
        *self.device_size.write().unwrap_or_else(PoisonError::into_inner) = size;
        debug!(%size, "device geometry changed");
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl DeviceSession for ChannelSession {
    fn device_size(&self) -> Size {
        *self.device_size.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn send_control(&self, command: ControlCommand) {
        if self.control_tx.send(command).is_err() {
            debug!("control receiver dropped; command discarded");
        }
    }

    fn subscribe(&self, listener: Arc<dyn FrameListener>) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }
}
