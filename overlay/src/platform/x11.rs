//! X11 surface: an override-redirect ARGB window fed through MIT-SHM
//!
//! The window carries dock/above hints so compositors keep it over
//! fullscreen games, and an empty input shape so every click reaches the
//! window underneath. Transparency needs a running compositor.

use std::fmt::Display;
use std::fs::File;

use x11rb::atom_manager;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::shm::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    AtomEnum, ClipOrdering, ColormapAlloc, ConnectionExt as _, CreateGCAux, CreateWindowAux,
    EventMask, Gcontext, ImageFormat, PropMode, Rectangle, Screen, VisualClass, Visualid, Window,
    WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::shm::SharedMemory;
use super::{OverlayConfig, OverlayPlatform, PlatformError, Surface};
use crate::utils::rgba_to_bgra;

atom_manager! {
    HudAtoms: HudAtomsCookie {
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_STATE,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_SKIP_TASKBAR,
        _NET_WM_STATE_SKIP_PAGER,
        ATOM,
    }
}

fn request_failed(e: impl Display) -> PlatformError {
    PlatformError::Other(e.to_string())
}

fn missing(feature: &'static str) -> impl Fn(x11rb::errors::ReplyError) -> PlatformError {
    move |_| PlatformError::UnsupportedFeature(feature.to_string())
}

/// Window size as X11 carries it, plus the byte length of one BGRA frame
fn frame_geometry(width: u32, height: u32) -> Result<(u16, u16, usize), PlatformError> {
    let too_large = || PlatformError::BufferError(format!("{width}x{height} exceeds X11 limits"));
    let w = u16::try_from(width).map_err(|_| too_large())?;
    let h = u16::try_from(height).map_err(|_| too_large())?;
    let bytes = width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(too_large)?;
    Ok((w, h, bytes as usize))
}

/// Depth-32 TrueColor visual, required for per-pixel alpha
fn argb_visual(screen: &Screen) -> Option<(Visualid, u8)> {
    screen
        .allowed_depths
        .iter()
        .filter(|d| d.depth == 32)
        .find_map(|d| {
            d.visuals
                .iter()
                .find(|v| v.class == VisualClass::TRUE_COLOR)
                .map(|v| (v.visual_id, d.depth))
        })
}

pub struct X11Overlay {
    conn: RustConnection,
    window: Window,
    gc: Gcontext,
    depth: u8,
    width: u16,
    height: u16,
    segment: shm::Seg,
    memory: SharedMemory,
    click_through: bool,
    running: bool,
}

impl X11Overlay {
    fn attach_memory(
        conn: &RustConnection,
        len: usize,
    ) -> Result<(shm::Seg, SharedMemory), PlatformError> {
        let memory = SharedMemory::new(c"gsi-hud-x11-frame", len)?;
        let segment = conn.generate_id().map_err(request_failed)?;
        // The server takes ownership of the descriptor it is sent
        conn.shm_attach_fd(segment, File::from(memory.clone_fd()?), false)
            .map_err(|e| PlatformError::BufferError(format!("shm_attach_fd failed: {}", e)))?;
        Ok((segment, memory))
    }

    fn set_hints(&self, atoms: &HudAtoms, namespace: &str) -> Result<(), PlatformError> {
        let conn = &self.conn;
        conn.change_property32(
            PropMode::REPLACE,
            self.window,
            atoms._NET_WM_WINDOW_TYPE,
            atoms.ATOM,
            &[atoms._NET_WM_WINDOW_TYPE_DOCK],
        )
        .map_err(request_failed)?;
        conn.change_property32(
            PropMode::REPLACE,
            self.window,
            atoms._NET_WM_STATE,
            atoms.ATOM,
            &[
                atoms._NET_WM_STATE_ABOVE,
                atoms._NET_WM_STATE_SKIP_TASKBAR,
                atoms._NET_WM_STATE_SKIP_PAGER,
            ],
        )
        .map_err(request_failed)?;

        // WM_CLASS is instance\0class\0; both are the namespace so WM rules can match it
        let class = format!("{0}\0{0}\0", namespace);
        conn.change_property8(
            PropMode::REPLACE,
            self.window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            class.as_bytes(),
        )
        .map_err(request_failed)?;
        Ok(())
    }

    fn apply_input_shape(&self) {
        let whole = Rectangle {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        };
        let rects: &[Rectangle] = if self.click_through { &[] } else { &[whole] };
        let shaped = self.conn.shape_rectangles(
            shape::SO::SET,
            shape::SK::INPUT,
            ClipOrdering::UNSORTED,
            self.window,
            0,
            0,
            rects,
        );
        if let Err(e) = shaped.map(|_| ()).and_then(|()| self.conn.flush()) {
            tracing::warn!(error = %e, "Could not update X11 input shape");
        }
    }
}

impl OverlayPlatform for X11Overlay {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        let (width, height, frame_len) = frame_geometry(config.width, config.height)?;
        let position = |v: i32| {
            i16::try_from(v).map_err(|_| PlatformError::Other(format!("position {v} out of range")))
        };
        let (x, y) = (position(config.x)?, position(config.y)?);

        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| PlatformError::ConnectionFailed(e.to_string()))?;

        let atoms = HudAtoms::new(&conn)
            .map_err(request_failed)?
            .reply()
            .map_err(request_failed)?;
        conn.shape_query_version()
            .map_err(request_failed)?
            .reply()
            .map_err(missing("X11 Shape extension"))?;
        conn.shm_query_version()
            .map_err(request_failed)?
            .reply()
            .map_err(missing("X11 MIT-SHM extension"))?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let (visual, depth) = argb_visual(screen)
            .ok_or_else(|| PlatformError::UnsupportedFeature("32-bit ARGB visual".into()))?;

        let colormap = conn.generate_id().map_err(request_failed)?;
        conn.create_colormap(ColormapAlloc::NONE, colormap, root, visual)
            .map_err(request_failed)?;

        let window = conn.generate_id().map_err(request_failed)?;
        let attributes = CreateWindowAux::new()
            .background_pixel(0)
            .border_pixel(0)
            .colormap(colormap)
            .event_mask(EventMask::STRUCTURE_NOTIFY)
            // Keep the window manager from decorating or moving the HUD
            .override_redirect(1);
        conn.create_window(
            depth,
            window,
            root,
            x,
            y,
            width,
            height,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &attributes,
        )
        .map_err(request_failed)?;

        let gc = conn.generate_id().map_err(request_failed)?;
        conn.create_gc(gc, window, &CreateGCAux::new())
            .map_err(request_failed)?;

        let (segment, memory) = Self::attach_memory(&conn, frame_len)?;

        let overlay = Self {
            conn,
            window,
            gc,
            depth,
            width,
            height,
            segment,
            memory,
            click_through: config.click_through,
            running: true,
        };
        overlay.set_hints(&atoms, &config.namespace)?;
        overlay.apply_input_shape();
        overlay.conn.map_window(window).map_err(request_failed)?;
        overlay.conn.flush().map_err(request_failed)?;

        tracing::info!(
            window,
            width = overlay.width,
            height = overlay.height,
            "X11 overlay window mapped"
        );
        Ok(overlay)
    }

    fn set_click_through(&mut self, enabled: bool) {
        self.click_through = enabled;
        self.apply_input_shape();
    }
}

impl Surface for X11Overlay {
    fn width(&self) -> u32 {
        u32::from(self.width)
    }

    fn height(&self) -> u32 {
        u32::from(self.height)
    }

    fn poll_events(&mut self) -> bool {
        loop {
            match self.conn.poll_for_event() {
                Ok(Some(Event::DestroyNotify(e))) if e.window == self.window => {
                    tracing::info!("X11 overlay window destroyed externally");
                    self.running = false;
                }
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "X11 connection lost");
                    self.running = false;
                    break;
                }
            }
        }
        self.running
    }

    fn present(&mut self, pixels: &[u8]) {
        if pixels.len() != self.memory.len() {
            tracing::debug!(pixels = pixels.len(), "Frame size does not match the X11 segment, skipped");
            return;
        }
        rgba_to_bgra(pixels, self.memory.as_mut_slice());

        let (w, h) = (self.width, self.height);
        let put = self.conn.shm_put_image(
            self.window,
            self.gc,
            w,
            h,
            0,
            0,
            w,
            h,
            0,
            0,
            self.depth,
            ImageFormat::Z_PIXMAP.into(),
            false,
            self.segment,
            0,
        );
        if let Err(e) = put.map(|_| ()).and_then(|()| self.conn.flush()) {
            tracing::debug!(error = %e, bytes = self.memory.len(), "Frame upload failed");
        }
    }
}

impl Drop for X11Overlay {
    fn drop(&mut self) {
        // The mapping itself is released when `memory` drops
        let _ = self.conn.shm_detach(self.segment);
        let _ = self.conn.free_gc(self.gc);
        let _ = self.conn.destroy_window(self.window);
        let _ = self.conn.flush();
        tracing::debug!(window = self.window, "X11 overlay window destroyed");
    }
}
