//! End-to-end tests: a fake device on localhost streams frames into a
//! `MirrorView` through a real `RemoteSession`, and pointer input on the
//! view comes back to the device as control commands.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use devmirror_core::remote::{DeviceCodec, DeviceInfo, DeviceMessage, RemoteSession};
use devmirror_core::{ControlCommand, DeviceSession, Frame, Point, Size, TouchAction};
use devmirror_view::{
    DirtyRect, MirrorView, PointerButton, PointerButtons, PointerEvent, PointerTranslator,
};

// ── Helpers ──────────────────────────────────────────────────────

const TIMEOUT: Duration = Duration::from_secs(5);

async fn fake_device(size: Size) -> (String, tokio::task::JoinHandle<Framed<TcpStream, DeviceCodec>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut device = Framed::new(stream, DeviceCodec::new());
        device
            .send(DeviceMessage::Hello(DeviceInfo {
                name: "fake".into(),
                size,
            }))
            .await
            .unwrap();
        device
    });
    (addr, handle)
}

/// Pump the view until it has a surface of `size` or the deadline passes.
/// Runs on a blocking thread: the view lives on the "rendering loop".
fn pump_until_size(mut view: MirrorView, size: Size) -> MirrorView {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        view.pump_timeout(Duration::from_millis(10));
        if view.surface().is_some_and(|s| s.size() == size) {
            break;
        }
    }
    view
}

// ── Frames in ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_device_frames_land_on_surface() {
    let (addr, device) = fake_device(Size::new(4, 2)).await;
    let session = Arc::new(RemoteSession::connect(addr, TIMEOUT).await.unwrap());
    let mut device = device.await.unwrap();

    let mut view = MirrorView::new(Duration::from_millis(200), PointerTranslator::default());
    view.attach_display(Size::new(400, 200));
    view.bind_session(Some(session.clone() as Arc<dyn DeviceSession>));

    let frame = Frame::solid(4, 2, [10, 20, 30, 255]);
    device.send(DeviceMessage::Frame(frame.clone())).await.unwrap();

    let view = tokio::task::spawn_blocking(move || pump_until_size(view, Size::new(4, 2)))
        .await
        .unwrap();

    let surface = view.surface().expect("no frame presented");
    assert_eq!(surface.to_vec(), frame.pixels.to_vec());
    assert_eq!(view.take_dirty(), Some(DirtyRect::full(4, 2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bad_frame_does_not_disturb_surface() {
    let (addr, device) = fake_device(Size::new(2, 2)).await;
    let session = Arc::new(RemoteSession::connect(addr, TIMEOUT).await.unwrap());
    let mut device = device.await.unwrap();

    let mut view = MirrorView::new(Duration::from_millis(200), PointerTranslator::default());
    view.attach_display(Size::new(200, 200));
    view.bind_session(Some(session.clone() as Arc<dyn DeviceSession>));

    device
        .send(DeviceMessage::Frame(Frame::solid(2, 2, [1, 1, 1, 1])))
        .await
        .unwrap();
    let view = tokio::task::spawn_blocking(move || pump_until_size(view, Size::new(2, 2)))
        .await
        .unwrap();
    view.take_dirty();

    // Short buffer claiming a larger size, then a good frame of a new size.
    device
        .send(DeviceMessage::Frame(Frame::new(3, 3, vec![0u8; 5])))
        .await
        .unwrap();
    device
        .send(DeviceMessage::Frame(Frame::solid(1, 1, [4, 4, 4, 4])))
        .await
        .unwrap();

    let view = tokio::task::spawn_blocking(move || pump_until_size(view, Size::new(1, 1)))
        .await
        .unwrap();

    assert_eq!(view.surface().unwrap().to_vec(), vec![4u8; 4]);
    let stats = view.present_stats();
    assert_eq!(stats.presented, 2);
    assert_eq!(stats.rejected, 1);
}

// ── Commands out ─────────────────────────────────────────────────

#[tokio::test]
async fn test_pointer_gesture_reaches_device() {
    let (addr, device) = fake_device(Size::new(500, 1000)).await;
    let session = Arc::new(RemoteSession::connect(addr, TIMEOUT).await.unwrap());
    let mut device = device.await.unwrap();

    let mut view = MirrorView::new(Duration::from_millis(200), PointerTranslator::default());
    view.attach_display(Size::new(1000, 500));
    view.bind_session(Some(session.clone() as Arc<dyn DeviceSession>));

    let none = PointerButtons::empty();
    view.handle_pointer(&PointerEvent::pressed(PointerButton::Primary, 100.0, 100.0, none));
    view.handle_pointer(&PointerEvent::moved(-5.0, 100.0, PointerButtons::PRIMARY));
    view.handle_pointer(&PointerEvent::moved(200.0, 100.0, PointerButtons::PRIMARY));
    view.handle_pointer(&PointerEvent::released(
        PointerButton::Primary,
        200.0,
        100.0,
        PointerButtons::PRIMARY,
    ));
    view.handle_pointer(&PointerEvent::pressed(PointerButton::Secondary, 0.0, 0.0, none));

    let mut received = Vec::new();
    for _ in 0..4 {
        let cmd = tokio::time::timeout(TIMEOUT, device.next())
            .await
            .expect("timeout")
            .expect("stream closed")
            .expect("decode error");
        received.push(cmd);
    }

    let expected_touches = [
        (TouchAction::Down, Point::new(50, 200)),
        (TouchAction::Move, Point::new(100, 200)),
        (TouchAction::Up, Point::new(100, 200)),
    ];
    for (cmd, (action, point)) in received.iter().zip(expected_touches) {
        match cmd {
            ControlCommand::Touch(t) => {
                assert_eq!(t.action, action);
                assert_eq!(t.point, point);
                assert_eq!(t.screen_size, Size::new(1000, 500));
            }
            other => panic!("expected touch, got {other:?}"),
        }
    }
    assert_eq!(received[3], ControlCommand::BackOrScreenOn);
}
