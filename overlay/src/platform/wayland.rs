//! Wayland surface on the wlr-layer-shell overlay layer
//!
//! The HUD is a layer surface anchored to the top-left corner of whichever
//! output the compositor chooses, offset by the configured position, with an
//! empty input region. Needs a compositor implementing wlr-layer-shell
//! (Sway, Hyprland, river, KDE Plasma, ...).

use wayland_client::globals::{GlobalListContents, registry_queue_init};
use wayland_client::protocol::wl_buffer::WlBuffer;
use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_region::WlRegion;
use wayland_client::protocol::wl_registry::WlRegistry;
use wayland_client::protocol::wl_shm::{Format, WlShm};
use wayland_client::protocol::wl_shm_pool::WlShmPool;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, Dispatch, EventQueue, Proxy, QueueHandle};
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::{
    Layer, ZwlrLayerShellV1,
};
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1::{
    self, Anchor, KeyboardInteractivity, ZwlrLayerSurfaceV1,
};

use super::shm::SharedMemory;
use super::{OverlayConfig, OverlayPlatform, PlatformError, Surface};
use crate::utils::rgba_to_bgra;

/// A wl_buffer together with the memory backing it
struct FrameBuffer {
    buffer: WlBuffer,
    memory: SharedMemory,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    fn new(
        shm: &WlShm,
        width: u32,
        height: u32,
        qh: &QueueHandle<LayerState>,
    ) -> Result<Self, PlatformError> {
        let stride = width * 4;
        let memory = SharedMemory::new(c"gsi-hud-wayland-frame", (stride * height) as usize)?;

        let pool = shm.create_pool(memory.fd(), memory.len() as i32, qh, ());
        // ARGB8888 is BGRA byte order on little-endian
        let buffer = pool.create_buffer(
            0,
            width as i32,
            height as i32,
            stride as i32,
            Format::Argb8888,
            qh,
            (),
        );
        pool.destroy();

        Ok(Self {
            buffer,
            memory,
            width,
            height,
        })
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

/// State touched by the event dispatchers
struct LayerState {
    configured: bool,
    closed: bool,
    width: u32,
    height: u32,
}

pub struct WaylandOverlay {
    connection: Connection,
    queue: EventQueue<LayerState>,
    qh: QueueHandle<LayerState>,
    state: LayerState,
    compositor: WlCompositor,
    shm: WlShm,
    surface: WlSurface,
    layer_surface: ZwlrLayerSurfaceV1,
    frame: Option<FrameBuffer>,
}

fn connection_error(e: impl std::fmt::Display) -> PlatformError {
    PlatformError::ConnectionFailed(e.to_string())
}

impl WaylandOverlay {
    /// Make sure the frame buffer matches the size the compositor configured
    fn sync_buffer(&mut self) -> Result<(), PlatformError> {
        let (width, height) = (self.state.width, self.state.height);
        let current = self.frame.as_ref().map(|f| (f.width, f.height));
        if current != Some((width, height)) {
            // Drop the old buffer before mapping the new one
            self.frame = None;
            self.frame = Some(FrameBuffer::new(&self.shm, width, height, &self.qh)?);
            tracing::debug!(width, height, "Wayland frame buffer (re)created");
        }
        Ok(())
    }
}

impl OverlayPlatform for WaylandOverlay {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        let connection = Connection::connect_to_env().map_err(connection_error)?;
        let (globals, mut queue) =
            registry_queue_init::<LayerState>(&connection).map_err(connection_error)?;
        let qh = queue.handle();

        let require = |name: &str| PlatformError::UnsupportedFeature(name.to_string());
        let compositor: WlCompositor = globals
            .bind(&qh, 4..=6, ())
            .map_err(|_| require("wl_compositor"))?;
        let layer_shell: ZwlrLayerShellV1 = globals
            .bind(&qh, 1..=4, ())
            .map_err(|_| require("zwlr_layer_shell_v1"))?;
        let shm: WlShm = globals.bind(&qh, 1..=1, ()).map_err(|_| require("wl_shm"))?;

        let surface = compositor.create_surface(&qh, ());
        let layer_surface = layer_shell.get_layer_surface(
            &surface,
            None,
            Layer::Overlay,
            config.namespace.clone(),
            &qh,
            (),
        );
        layer_surface.set_anchor(Anchor::Top | Anchor::Left);
        layer_surface.set_margin(config.y.max(0), 0, 0, config.x.max(0));
        layer_surface.set_size(config.width, config.height);
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::None);
        // -1: ignore other surfaces' exclusive zones and reserve none
        layer_surface.set_exclusive_zone(-1);
        surface.commit();

        let mut state = LayerState {
            configured: false,
            closed: false,
            width: config.width,
            height: config.height,
        };
        // A buffer may only be attached after the first configure
        while !state.configured && !state.closed {
            queue
                .blocking_dispatch(&mut state)
                .map_err(connection_error)?;
        }
        if state.closed {
            return Err(PlatformError::Other(
                "layer surface closed before first configure".to_string(),
            ));
        }

        let mut overlay = Self {
            connection,
            queue,
            qh,
            state,
            compositor,
            shm,
            surface,
            layer_surface,
            frame: None,
        };
        overlay.sync_buffer()?;
        overlay.set_click_through(config.click_through);

        tracing::info!(
            width = overlay.state.width,
            height = overlay.state.height,
            namespace = %config.namespace,
            "Wayland layer surface configured"
        );
        Ok(overlay)
    }

    fn set_click_through(&mut self, enabled: bool) {
        let region = self.compositor.create_region(&self.qh, ());
        if !enabled {
            region.add(0, 0, self.state.width as i32, self.state.height as i32);
        }
        self.surface.set_input_region(Some(&region));
        region.destroy();
        self.surface.commit();
    }
}

impl Surface for WaylandOverlay {
    fn width(&self) -> u32 {
        self.state.width
    }

    fn height(&self) -> u32 {
        self.state.height
    }

    fn poll_events(&mut self) -> bool {
        if let Err(e) = self.connection.flush() {
            tracing::error!(error = %e, "Wayland connection lost");
            return false;
        }

        // Read whatever is on the socket without blocking, then dispatch it
        if let Some(guard) = self.queue.prepare_read() {
            let _ = guard.read();
        }
        if let Err(e) = self.queue.dispatch_pending(&mut self.state) {
            tracing::error!(error = %e, "Wayland dispatch failed");
            return false;
        }

        if self.state.closed {
            return false;
        }
        if let Err(e) = self.sync_buffer() {
            tracing::error!(error = %e, "Failed to resize Wayland buffer");
            return false;
        }
        true
    }

    fn present(&mut self, pixels: &[u8]) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        if pixels.len() != frame.memory.len() {
            tracing::debug!(
                pixels = pixels.len(),
                buffer = frame.memory.len(),
                "Frame size does not match the Wayland buffer, skipped"
            );
            return;
        }
        rgba_to_bgra(pixels, frame.memory.as_mut_slice());

        self.surface.attach(Some(&frame.buffer), 0, 0);
        self.surface
            .damage_buffer(0, 0, frame.width as i32, frame.height as i32);
        self.surface.commit();
        let _ = self.connection.flush();
    }
}

impl Drop for WaylandOverlay {
    fn drop(&mut self) {
        self.frame = None;
        self.layer_surface.destroy();
        self.surface.destroy();
        let _ = self.connection.flush();
        tracing::debug!("Wayland layer surface destroyed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Dispatch impls for objects whose events the HUD does not care about
macro_rules! ignore_events {
    ($($proxy:ty => $data:ty),* $(,)?) => {
        $(
            impl Dispatch<$proxy, $data> for LayerState {
                fn event(
                    _: &mut Self,
                    _: &$proxy,
                    _: <$proxy as Proxy>::Event,
                    _: &$data,
                    _: &Connection,
                    _: &QueueHandle<Self>,
                ) {
                }
            }
        )*
    };
}

ignore_events!(
    WlRegistry => GlobalListContents,
    WlCompositor => (),
    WlSurface => (),
    WlRegion => (),
    WlShm => (),
    WlShmPool => (),
    WlBuffer => (),
    ZwlrLayerShellV1 => (),
);

impl Dispatch<ZwlrLayerSurfaceV1, ()> for LayerState {
    fn event(
        state: &mut Self,
        layer_surface: &ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => {
                layer_surface.ack_configure(serial);
                // Zero means "client decides": keep the requested size
                if width > 0 && height > 0 {
                    state.width = width;
                    state.height = height;
                }
                state.configured = true;
            }
            zwlr_layer_surface_v1::Event::Closed => {
                tracing::info!("Compositor closed the layer surface");
                state.closed = true;
            }
            _ => {}
        }
    }
}
