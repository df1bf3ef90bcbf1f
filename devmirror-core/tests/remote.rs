//! Integration tests: a fake device on localhost talking to a real
//! `RemoteSession`: handshake, frame delivery, geometry updates, and
//! control commands.

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use devmirror_core::remote::{DeviceCodec, DeviceInfo, DeviceMessage, RemoteSession};
use devmirror_core::{
    ControlCommand, DeviceSession, Frame, FrameListener, MirrorError, Point, Size, TouchAction,
};

// ── Helpers ──────────────────────────────────────────────────────

const TIMEOUT: Duration = Duration::from_secs(5);

async fn ephemeral_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

async fn accept_device(listener: &TcpListener, size: Size) -> Framed<TcpStream, DeviceCodec> {
    let (stream, _) = listener.accept().await.unwrap();
    let mut device = Framed::new(stream, DeviceCodec::new());
    device
        .send(DeviceMessage::Hello(DeviceInfo {
            name: "pixel-test".into(),
            size,
        }))
        .await
        .unwrap();
    device
}

/// Forwards every frame into a std channel.
struct Forward(Mutex<mpsc::Sender<Frame>>);

impl FrameListener for Forward {
    fn on_frame(&self, frame: Frame) {
        let _ = self.0.lock().unwrap().send(frame);
    }
}

// ── Handshake ────────────────────────────────────────────────────

#[tokio::test]
async fn test_handshake_reports_device() {
    let (listener, addr) = ephemeral_listener().await;
    let device = tokio::spawn(async move {
        let device = accept_device(&listener, Size::new(1080, 2400)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(device);
    });

    let session = RemoteSession::connect(addr, TIMEOUT).await.unwrap();
    assert_eq!(session.name(), "pixel-test");
    assert_eq!(session.device_size(), Size::new(1080, 2400));
    device.await.unwrap();
}

#[tokio::test]
async fn test_handshake_rejects_missing_hello() {
    let (listener, addr) = ephemeral_listener().await;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut device = Framed::new(stream, DeviceCodec::new());
        device
            .send(DeviceMessage::Geometry(Size::new(1, 1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    let err = RemoteSession::connect(addr, TIMEOUT).await.err().unwrap();
    assert!(matches!(err, MirrorError::Handshake(_)));
}

#[tokio::test]
async fn test_handshake_times_out() {
    let (listener, addr) = ephemeral_listener().await;
    let silent = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(stream);
    });

    let err = RemoteSession::connect(addr, Duration::from_millis(100))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, MirrorError::Timeout(_)));
    silent.abort();
}

// ── Frames ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_frames_reach_listener() {
    let (listener, addr) = ephemeral_listener().await;
    let device = tokio::spawn(async move {
        let mut device = accept_device(&listener, Size::new(4, 4)).await;
        // Give the client time to subscribe before streaming.
        tokio::time::sleep(Duration::from_millis(200)).await;
        device
            .send(DeviceMessage::Frame(Frame::solid(4, 4, [1, 2, 3, 4])))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let session = RemoteSession::connect(addr, TIMEOUT).await.unwrap();
    let (tx, rx) = mpsc::channel();
    session.subscribe(Arc::new(Forward(Mutex::new(tx))));

    let frame = tokio::task::spawn_blocking(move || rx.recv_timeout(TIMEOUT))
        .await
        .unwrap()
        .expect("no frame delivered");
    assert_eq!(frame.size(), Size::new(4, 4));
    assert_eq!(&frame.pixels[..4], &[1, 2, 3, 4]);
    device.await.unwrap();
}

#[tokio::test]
async fn test_geometry_update() {
    let (listener, addr) = ephemeral_listener().await;
    let device = tokio::spawn(async move {
        let mut device = accept_device(&listener, Size::new(1080, 2400)).await;
        device
            .send(DeviceMessage::Geometry(Size::new(2400, 1080)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let session = RemoteSession::connect(addr, TIMEOUT).await.unwrap();
    let rotated = tokio::time::timeout(TIMEOUT, async {
        loop {
            if session.device_size() == Size::new(2400, 1080) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(rotated.is_ok(), "geometry update never applied");
    device.await.unwrap();
}

// ── Control ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_control_commands_reach_device() {
    let (listener, addr) = ephemeral_listener().await;
    let device = tokio::spawn(async move {
        let mut device = accept_device(&listener, Size::new(100, 100)).await;
        let mut received = Vec::new();
        for _ in 0..2 {
            let cmd = tokio::time::timeout(TIMEOUT, device.next())
                .await
                .expect("timeout")
                .expect("stream closed")
                .expect("decode error");
            received.push(cmd);
        }
        received
    });

    let session = RemoteSession::connect(addr, TIMEOUT).await.unwrap();
    let touch = ControlCommand::touch(TouchAction::Down, Point::new(5, 6), Size::new(50, 50));
    session.send_control(touch);
    session.send_control(ControlCommand::BackOrScreenOn);

    let received = device.await.unwrap();
    assert_eq!(received, vec![touch, ControlCommand::BackOrScreenOn]);
}

#[tokio::test]
async fn test_close_stops_reader() {
    let (listener, addr) = ephemeral_listener().await;
    let device = tokio::spawn(async move {
        let device = accept_device(&listener, Size::new(10, 10)).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(device);
    });

    let session = RemoteSession::connect(addr, TIMEOUT).await.unwrap();
    assert!(session.is_connected());
    session.close();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!session.is_connected());
    device.await.unwrap();
}
