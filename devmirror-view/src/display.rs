//! Display renderer. Paints the mirror [`Surface`] into the window.
//!
//! Uses GDI `StretchDIBits`, stretching the device frame to the
//! window's client area. The pixel buffer is read under the surface
//! lock for the duration of the blit.

#[cfg(target_os = "windows")]
mod platform {
    use windows::Win32::Foundation::*;
    use windows::Win32::Graphics::Gdi::*;

    use crate::surface::Surface;

    /// Paints BGRA8 surfaces into an HWND using GDI.
    pub struct DisplayRenderer {
        hwnd: HWND,
        width: u32,
        height: u32,
    }

    impl DisplayRenderer {
        pub fn new(hwnd: HWND, width: u32, height: u32) -> Self {
            Self { hwnd, width, height }
        }

        /// Update the client-area size (call after WM_SIZE).
        pub fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }

        /// Stretch `surface` over the whole client area.
        pub fn render(&self, surface: &Surface) -> Result<(), String> {
            if surface.width() == 0 || surface.height() == 0 {
                return Ok(());
            }

            let bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: surface.width(),
                    // Negative height = top-down DIB (origin at top-left).
                    biHeight: -surface.height(),
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                bmiColors: [RGBQUAD::default(); 1],
            };

            surface.with_pixels(|pixels| unsafe {
                let hdc = GetDC(self.hwnd);
                if hdc.is_invalid() {
                    return Err("GetDC failed".to_string());
                }

                StretchDIBits(
                    hdc,
                    0,
                    0,
                    self.width as i32,
                    self.height as i32,
                    0,
                    0,
                    surface.width(),
                    surface.height(),
                    Some(pixels.as_ptr() as *const _),
                    &bmi,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );

                ReleaseDC(self.hwnd, hdc);
                Ok(())
            })
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use crate::surface::Surface;

    pub struct DisplayRenderer;

    impl DisplayRenderer {
        pub fn new(_hwnd: (), _w: u32, _h: u32) -> Self {
            Self
        }

        pub fn resize(&mut self, _w: u32, _h: u32) {}

        pub fn render(&self, _surface: &Surface) -> Result<(), String> {
            Err("Display rendering is only supported on Windows".into())
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
