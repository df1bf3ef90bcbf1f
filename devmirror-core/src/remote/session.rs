//! [`RemoteSession`]: a [`DeviceSession`] over one TCP connection.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::control::ControlCommand;
use crate::error::MirrorError;
use crate::frame::Frame;
use crate::geometry::Size;
use crate::remote::codec::ClientCodec;
use crate::remote::{DeviceInfo, DeviceMessage};
use crate::session::{DeviceSession, FrameListener, ListenerSet, SubscriptionId};

/// Frames buffered between the socket reader and the dispatch thread.
/// When the dispatch thread falls behind, newer frames are dropped.
const FRAME_QUEUE_DEPTH: usize = 2;

/// Connected device.
///
/// Frames are delivered to listeners from a dedicated `frame-dispatch`
/// OS thread, one at a time, in arrival order. Listeners may block that
/// thread (a presenter waits for its rendering context) without stalling
/// the socket.
pub struct RemoteSession {
    name: String,
    device_size: Arc<RwLock<Size>>,
    listeners: Arc<ListenerSet>,
    control_tx: mpsc::UnboundedSender<ControlCommand>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RemoteSession {
    /// Connect to a device and wait for its `Hello`.
    ///
    /// `timeout` bounds both the TCP connect and the handshake.
    pub async fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self, MirrorError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| MirrorError::Timeout(timeout))??;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        let (sink, mut source) = Framed::new(stream, ClientCodec::new()).split();

        let info = match tokio::time::timeout(timeout, source.next())
            .await
            .map_err(|_| MirrorError::Timeout(timeout))?
        {
            Some(Ok(DeviceMessage::Hello(info))) => info,
            Some(Ok(_)) => return Err(MirrorError::Handshake("expected hello as first message")),
            Some(Err(e)) => return Err(e),
            None => return Err(MirrorError::Handshake("connection closed before hello")),
        };
        info!(device = %info.name, size = %info.size, %peer, "device connected");

        let DeviceInfo { name, size } = info;
        let device_size = Arc::new(RwLock::new(size));
        let listeners = Arc::new(ListenerSet::new());

        // Producer context: the only thread that calls listeners.
        let (frame_tx, mut frame_rx) = mpsc::channel::<Frame>(FRAME_QUEUE_DEPTH);
        let dispatch_listeners = Arc::clone(&listeners);
        std::thread::Builder::new()
            .name("frame-dispatch".into())
            .spawn(move || {
                while let Some(frame) = frame_rx.blocking_recv() {
                    dispatch_listeners.notify(&frame);
                }
                debug!("frame dispatch thread exiting");
            })?;

        // Socket -> frame queue / geometry.
        let reader_size = Arc::clone(&device_size);
        let reader = tokio::spawn(async move {
            while let Some(result) = source.next().await {
                match result {
                    Ok(DeviceMessage::Frame(frame)) => match frame_tx.try_send(frame) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            trace!("frame dispatch busy; dropping frame");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    },
                    Ok(DeviceMessage::Geometry(size)) => {
                        *reader_size.write().unwrap_or_else(PoisonError::into_inner) = size;
                        debug!(%size, "device geometry changed");
                    }
                    Ok(DeviceMessage::Hello(_)) => {
                        warn!("ignoring repeated hello from device");
                    }
                    Err(e) => {
                        warn!("device stream error: {e}");
                        break;
                    }
                }
            }
            debug!("device stream ended");
        });

        // Control queue -> socket.
        let (control_tx, mut control_rx) = mpsc::unbounded_channel::<ControlCommand>();
        let writer = tokio::spawn(async move {
            let mut sink = sink;
            while let Some(command) = control_rx.recv().await {
                if let Err(e) = sink.send(command).await {
                    warn!("control write error: {e}");
                    break;
                }
            }
        });

        Ok(Self {
            name,
            device_size,
            listeners,
            control_tx,
            reader,
            writer,
        })
    }

    /// Device name from the handshake.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the socket reader is still running.
    pub fn is_connected(&self) -> bool {
        !self.reader.is_finished()
    }

    /// Stop the reader and writer. Listeners receive no further frames
    /// once the frame already in dispatch (if any) has been delivered.
    pub fn close(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl DeviceSession for RemoteSession {
    fn device_size(&self) -> Size {
        *self.device_size.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn send_control(&self, command: ControlCommand) {
        if self.control_tx.send(command).is_err() {
            debug!("control writer stopped; command discarded");
        }
    }

    fn subscribe(&self, listener: Arc<dyn FrameListener>) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }
}
