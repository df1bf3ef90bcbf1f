//! Win32 window creation and message loop.
//!
//! Creates the native HWND the display renderer paints into. Mouse
//! messages become [`PointerEvent`]s in client coordinates; the window
//! captures the mouse while a button is held so drags that leave the
//! client area keep reporting (with negative or oversized positions).

pub use crate::translator::PointerEvent;

#[cfg(target_os = "windows")]
mod platform {
    use std::sync::mpsc;

    use windows::Win32::Foundation::*;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture};
    use windows::Win32::UI::WindowsAndMessaging::*;
    use windows::core::PCWSTR;

    use crate::translator::{PointerButton, PointerButtons, PointerEvent};

    // wParam key-state bits for mouse messages.
    const MK_LBUTTON: usize = 0x0001;
    const MK_RBUTTON: usize = 0x0002;
    const MK_MBUTTON: usize = 0x0010;

    /// Events produced by the window message loop.
    #[derive(Debug, Clone)]
    pub enum WindowEvent {
        /// Window close requested (Alt-F4/X button).
        Close,
        /// Client area resized.
        Resize(u32, u32),
        /// Mouse input over (or captured by) the client area.
        Pointer(PointerEvent),
    }

    /// Handle to the native window.
    pub struct NativeWindow {
        pub hwnd: HWND,
        pub width: u32,
        pub height: u32,
        event_rx: mpsc::Receiver<WindowEvent>,
    }

    fn held_buttons(wparam: WPARAM) -> PointerButtons {
        let mut buttons = PointerButtons::empty();
        buttons.set(PointerButtons::PRIMARY, wparam.0 & MK_LBUTTON != 0);
        buttons.set(PointerButtons::SECONDARY, wparam.0 & MK_RBUTTON != 0);
        buttons.set(PointerButtons::MIDDLE, wparam.0 & MK_MBUTTON != 0);
        buttons
    }

    fn client_position(lparam: LPARAM) -> (f64, f64) {
        let x = (lparam.0 & 0xFFFF) as i16;
        let y = ((lparam.0 >> 16) & 0xFFFF) as i16;
        (f64::from(x), f64::from(y))
    }

    fn button_message(msg: u32) -> Option<(PointerButton, bool)> {
        match msg {
            WM_LBUTTONDOWN => Some((PointerButton::Primary, true)),
            WM_LBUTTONUP => Some((PointerButton::Primary, false)),
            WM_RBUTTONDOWN => Some((PointerButton::Secondary, true)),
            WM_RBUTTONUP => Some((PointerButton::Secondary, false)),
            WM_MBUTTONDOWN => Some((PointerButton::Middle, true)),
            WM_MBUTTONUP => Some((PointerButton::Middle, false)),
            _ => None,
        }
    }

    // The boxed mpsc sender lives in GWLP_USERDATA for the window's
    // lifetime and is reclaimed in `Drop`.
    unsafe extern "system" fn wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let tx_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const mpsc::Sender<WindowEvent>;

        if tx_ptr.is_null() {
            return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
        }

        let tx = unsafe { &*tx_ptr };

        if let Some((button, pressed)) = button_message(msg) {
            let (x, y) = client_position(lparam);
            let buttons = held_buttons(wparam);
            let event = if pressed {
                unsafe { SetCapture(hwnd) };
                PointerEvent::pressed(button, x, y, buttons)
            } else {
                if buttons.is_empty() {
                    let _ = unsafe { ReleaseCapture() };
                }
                PointerEvent::released(button, x, y, buttons)
            };
            let _ = tx.send(WindowEvent::Pointer(event));
            return LRESULT(0);
        }

        match msg {
            WM_CLOSE => {
                let _ = tx.send(WindowEvent::Close);
                LRESULT(0)
            }
            WM_SIZE => {
                let w = (lparam.0 & 0xFFFF) as u32;
                let h = ((lparam.0 >> 16) & 0xFFFF) as u32;
                let _ = tx.send(WindowEvent::Resize(w, h));
                LRESULT(0)
            }
            WM_MOUSEMOVE => {
                let (x, y) = client_position(lparam);
                let event = PointerEvent::moved(x, y, held_buttons(wparam));
                let _ = tx.send(WindowEvent::Pointer(event));
                LRESULT(0)
            }
            WM_DESTROY => {
                unsafe { PostQuitMessage(0) };
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    impl NativeWindow {
        /// Create a new top-level window.
        pub fn create(title: &str, width: u32, height: u32) -> Result<Self, String> {
            let (event_tx, event_rx) = mpsc::channel();

            let hinstance = unsafe { GetModuleHandleW(None) }
                .map_err(|e| format!("GetModuleHandle: {e}"))?;

            let class_name_wide: Vec<u16> = "DevmirrorViewClass\0".encode_utf16().collect();

            let wc = WNDCLASSW {
                lpfnWndProc: Some(wndproc),
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name_wide.as_ptr()),
                hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
                ..Default::default()
            };

            if unsafe { RegisterClassW(&wc) } == 0 {
                return Err("RegisterClassW failed".into());
            }

            let title_wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();

            let hwnd = unsafe {
                CreateWindowExW(
                    WINDOW_EX_STYLE(0),
                    PCWSTR(class_name_wide.as_ptr()),
                    PCWSTR(title_wide.as_ptr()),
                    WS_OVERLAPPEDWINDOW | WS_VISIBLE,
                    CW_USEDEFAULT,
                    CW_USEDEFAULT,
                    width as i32,
                    height as i32,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .map_err(|e| format!("CreateWindowExW failed: {e}"))?;

            let tx_ptr = Box::into_raw(Box::new(event_tx));
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, tx_ptr as isize);
            }

            Ok(Self {
                hwnd,
                width,
                height,
                event_rx,
            })
        }

        /// Pump window messages (non-blocking). Returns collected events.
        pub fn poll_events(&self) -> Vec<WindowEvent> {
            unsafe {
                let mut msg = MSG::default();
                while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE).as_bool() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
            self.event_rx.try_iter().collect()
        }

        pub fn hwnd(&self) -> HWND {
            self.hwnd
        }

        /// Current client-area size, excluding borders and title bar.
        ///
        /// The `WM_SIZE` sent during `CreateWindowExW` arrives before the
        /// event sender is installed, so the initial size must be read
        /// here rather than waited for.
        pub fn client_size(&self) -> (u32, u32) {
            let mut rect = RECT::default();
            if unsafe { GetClientRect(self.hwnd, &mut rect) }.is_err() {
                return (self.width, self.height);
            }
            (
                u32::try_from(rect.right - rect.left).unwrap_or(0),
                u32::try_from(rect.bottom - rect.top).unwrap_or(0),
            )
        }
    }

    impl Drop for NativeWindow {
        fn drop(&mut self) {
            unsafe {
                let ptr = GetWindowLongPtrW(self.hwnd, GWLP_USERDATA) as *mut mpsc::Sender<WindowEvent>;
                if !ptr.is_null() {
                    SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
                    drop(Box::from_raw(ptr));
                }
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;


// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use super::PointerEvent;

    #[derive(Debug, Clone)]
    pub enum WindowEvent {
        Close,
        Resize(u32, u32),
        Pointer(PointerEvent),
    }

    pub struct NativeWindow;

    impl NativeWindow {
        pub fn create(_title: &str, _w: u32, _h: u32) -> Result<Self, String> {
            Err("Window creation is only supported on Windows".into())
        }

        pub fn hwnd(&self) {}

        pub fn client_size(&self) -> (u32, u32) {
            (0, 0)
        }

        pub fn poll_events(&self) -> Vec<WindowEvent> {
            Vec::new()
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
