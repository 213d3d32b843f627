//! Windows surface: a layered, topmost tool-window popup
//!
//! Frames are written straight into a top-down 32-bit DIB section and pushed
//! with `UpdateLayeredWindow`, which gives per-pixel alpha without a
//! compositor round trip. `WS_EX_TRANSPARENT` makes the window click-through.
//!
//! Win32 message queues belong to the creating thread, so the overlay must be
//! created on the thread that polls and presents it.

use std::ffi::c_void;
use std::mem::size_of;

use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, POINT, SIZE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BLENDFUNCTION, CreateCompatibleDC, CreateDIBSection,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, HBITMAP, HDC, ReleaseDC, SelectObject,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GWL_EXSTYLE, HTCLIENT, MSG,
    PM_REMOVE, PeekMessageW, RegisterClassExW, SW_SHOWNOACTIVATE, SetWindowLongPtrW, ShowWindow,
    TranslateMessage, ULW_ALPHA, UpdateLayeredWindow, WINDOW_EX_STYLE, WM_ERASEBKGND,
    WM_NCHITTEST, WM_QUIT, WNDCLASSEXW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
    WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};
use windows::core::PCWSTR;

use super::{OverlayConfig, OverlayPlatform, PlatformError, Surface};
use crate::utils::rgba_to_bgra;

const WINDOW_CLASS: &str = "GsiHudOverlay";
const ERROR_CLASS_ALREADY_EXISTS: i32 = 1410;

/// Premultiplied per-pixel alpha, source over
const BLEND: BLENDFUNCTION = BLENDFUNCTION {
    BlendOp: 0,
    BlendFlags: 0,
    SourceConstantAlpha: 255,
    AlphaFormat: 1,
};

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(Some(0)).collect()
}

fn win32_error(call: &str, e: impl std::fmt::Display) -> PlatformError {
    PlatformError::Other(format!("{} failed: {}", call, e))
}

fn ex_style(click_through: bool) -> WINDOW_EX_STYLE {
    let style = WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW;
    if click_through {
        style | WS_EX_TRANSPARENT | WS_EX_NOACTIVATE
    } else {
        style
    }
}

fn register_class() -> Result<(), PlatformError> {
    let class_name = wide(WINDOW_CLASS);
    // SAFETY: plain Win32 calls with a class name that outlives them
    unsafe {
        let instance = GetModuleHandleW(None).map_err(|e| win32_error("GetModuleHandleW", e))?;
        let class = WNDCLASSEXW {
            cbSize: size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(window_proc),
            hInstance: instance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        if RegisterClassExW(&class) == 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(ERROR_CLASS_ALREADY_EXISTS) {
                return Err(win32_error("RegisterClassExW", err));
            }
        }
    }
    Ok(())
}

/// Memory DC with a top-down BGRA DIB section selected into it
struct DibSection {
    dc: HDC,
    bitmap: HBITMAP,
    bits: *mut u8,
    len: usize,
}

impl DibSection {
    fn new(width: u32, height: u32) -> Result<Self, PlatformError> {
        let too_large = || PlatformError::BufferError(format!("{width}x{height} is too large"));
        let len = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(too_large)? as usize;
        let width = i32::try_from(width).map_err(|_| too_large())?;
        let height = i32::try_from(height).map_err(|_| too_large())?;

        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height: rows run top to bottom like the pixmap
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        // SAFETY: every handle created here is either returned inside Self or
        // released on the error path
        unsafe {
            let screen = GetDC(HWND::default());
            let dc = CreateCompatibleDC(screen);
            let mut bits: *mut c_void = std::ptr::null_mut();
            let bitmap = CreateDIBSection(screen, &info, DIB_RGB_COLORS, &mut bits, None, 0);
            ReleaseDC(HWND::default(), screen);

            let bitmap = match bitmap {
                Ok(bitmap) if !dc.is_invalid() && !bits.is_null() => bitmap,
                other => {
                    if let Ok(bitmap) = other {
                        let _ = DeleteObject(bitmap);
                    }
                    if !dc.is_invalid() {
                        let _ = DeleteDC(dc);
                    }
                    return Err(PlatformError::BufferError(
                        "could not create DIB section".to_string(),
                    ));
                }
            };
            SelectObject(dc, bitmap);

            Ok(Self {
                dc,
                bitmap,
                bits: bits.cast(),
                len,
            })
        }
    }

    fn pixels(&mut self) -> &mut [u8] {
        // SAFETY: bits points at the len-byte DIB owned by self
        unsafe { std::slice::from_raw_parts_mut(self.bits, self.len) }
    }
}

impl Drop for DibSection {
    fn drop(&mut self) {
        // SAFETY: both handles are owned by self and no longer used
        unsafe {
            let _ = DeleteDC(self.dc);
            let _ = DeleteObject(self.bitmap);
        }
    }
}

pub struct WindowsOverlay {
    hwnd: HWND,
    dib: DibSection,
    origin: POINT,
    size: SIZE,
    running: bool,
}

impl OverlayPlatform for WindowsOverlay {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        register_class()?;

        let dib = DibSection::new(config.width, config.height)?;
        let class_name = wide(WINDOW_CLASS);
        let title = wide(&config.namespace);

        // SAFETY: the wide strings outlive the call
        let hwnd = unsafe {
            let instance =
                GetModuleHandleW(None).map_err(|e| win32_error("GetModuleHandleW", e))?;
            CreateWindowExW(
                ex_style(config.click_through),
                PCWSTR(class_name.as_ptr()),
                PCWSTR(title.as_ptr()),
                WS_POPUP,
                config.x,
                config.y,
                config.width as i32,
                config.height as i32,
                None,
                None,
                instance,
                None,
            )
            .map_err(|e| win32_error("CreateWindowExW", e))?
        };

        // SAFETY: hwnd was just created on this thread
        unsafe {
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
        }
        tracing::info!(
            ?hwnd,
            width = config.width,
            height = config.height,
            "Layered overlay window shown"
        );

        Ok(Self {
            hwnd,
            dib,
            origin: POINT {
                x: config.x,
                y: config.y,
            },
            size: SIZE {
                cx: config.width as i32,
                cy: config.height as i32,
            },
            running: true,
        })
    }

    fn set_click_through(&mut self, enabled: bool) {
        // SAFETY: hwnd belongs to this thread for the lifetime of self
        unsafe {
            SetWindowLongPtrW(self.hwnd, GWL_EXSTYLE, ex_style(enabled).0 as isize);
        }
    }
}

impl Surface for WindowsOverlay {
    fn width(&self) -> u32 {
        self.size.cx as u32
    }

    fn height(&self) -> u32 {
        self.size.cy as u32
    }

    fn poll_events(&mut self) -> bool {
        let mut msg = MSG::default();
        // SAFETY: standard message pump on the window's own thread
        unsafe {
            while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE).as_bool() {
                if msg.message == WM_QUIT {
                    tracing::info!("Overlay window received WM_QUIT");
                    self.running = false;
                    break;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        self.running
    }

    fn present(&mut self, pixels: &[u8]) {
        if pixels.len() != self.dib.len {
            tracing::debug!(pixels = pixels.len(), "Frame size does not match the DIB, skipped");
            return;
        }
        rgba_to_bgra(pixels, self.dib.pixels());

        let source = POINT { x: 0, y: 0 };
        // SAFETY: the memory DC and window are owned by self
        unsafe {
            let screen = GetDC(HWND::default());
            if let Err(e) = UpdateLayeredWindow(
                self.hwnd,
                screen,
                Some(&self.origin),
                Some(&self.size),
                self.dib.dc,
                Some(&source),
                COLORREF(0),
                Some(&BLEND),
                ULW_ALPHA,
            ) {
                tracing::debug!(error = %e, "UpdateLayeredWindow failed");
            }
            ReleaseDC(HWND::default(), screen);
        }
    }
}

impl Drop for WindowsOverlay {
    fn drop(&mut self) {
        // SAFETY: the window is owned by self; the DIB is released after this
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
        tracing::debug!(hwnd = ?self.hwnd, "Overlay window destroyed");
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        // Hit-testing is irrelevant once WS_EX_TRANSPARENT is set
        WM_NCHITTEST => LRESULT(HTCLIENT as isize),
        WM_ERASEBKGND => LRESULT(1),
        // SAFETY: forwarding the arguments we were called with
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}
