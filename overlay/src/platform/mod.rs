//! Platform abstraction for the overlay surface
//!
//! [`Surface`] is all the render thread needs from a window: its size, an
//! event pump and a way to put a finished frame on screen. Native backends
//! additionally implement [`OverlayPlatform`] so they can be created from an
//! [`OverlayConfig`].

use gsi_hud_types::SurfaceSettings;

#[cfg(all(unix, not(target_os = "macos")))]
pub mod wayland;

#[cfg(all(unix, not(target_os = "macos")))]
pub mod x11;

#[cfg(all(unix, not(target_os = "macos")))]
mod shm;

#[cfg(target_os = "windows")]
pub mod windows;

/// Placement of a native overlay window, in screen pixels from the top-left
/// corner of the output
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// X11 WM_CLASS / layer-shell namespace
    pub namespace: String,
    pub click_through: bool,
}

impl From<&SurfaceSettings> for OverlayConfig {
    fn from(settings: &SurfaceSettings) -> Self {
        Self {
            x: settings.x,
            y: settings.y,
            width: settings.width,
            height: settings.height,
            namespace: settings.namespace.clone(),
            click_through: settings.click_through,
        }
    }
}

/// Failure reported by a native window backend
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("cannot connect to display server: {0}")]
    ConnectionFailed(String),

    #[error("display server lacks {0}")]
    UnsupportedFeature(String),

    #[error("frame buffer error: {0}")]
    BufferError(String),

    #[error("platform error: {0}")]
    Other(String),
}

/// A window the render thread can present frames to
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Process pending platform events (non-blocking).
    /// Returns false once the surface has been closed.
    fn poll_events(&mut self) -> bool;

    /// Copy an RGBA premultiplied frame of `width * height` pixels to screen
    fn present(&mut self, pixels: &[u8]);
}

/// Trait that all native backends implement
pub trait OverlayPlatform: Surface + Sized {
    /// Create and show a new overlay window
    fn new(config: OverlayConfig) -> Result<Self, PlatformError>;

    /// Enable or disable click-through mode
    fn set_click_through(&mut self, enabled: bool);
}

/// Re-export the appropriate platform for the current target
#[cfg(all(unix, not(target_os = "macos")))]
pub use linux::LinuxOverlay as NativeOverlay;

#[cfg(target_os = "windows")]
pub use windows::WindowsOverlay as NativeOverlay;

#[cfg(not(any(all(unix, not(target_os = "macos")), target_os = "windows")))]
pub use unsupported::UnsupportedOverlay as NativeOverlay;

/// Ask the scheduler to favor every other thread over the calling one.
///
/// Best effort: failure is logged and otherwise ignored.
pub fn lower_thread_priority() {
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        // nice() is per-thread on Linux
        if let Err(e) = rustix::process::nice(19) {
            tracing::warn!(error = %e, "Could not lower render thread priority");
        }
    }

    #[cfg(target_os = "windows")]
    {
        use ::windows::Win32::System::Threading::{
            GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_LOWEST,
        };
        // SAFETY: the pseudo-handle of the current thread is always valid
        if let Err(e) = unsafe { SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_LOWEST) } {
            tracing::warn!(error = %e, "Could not lower render thread priority");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Linux Runtime Detection (Wayland vs X11)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(all(unix, not(target_os = "macos")))]
mod linux {
    use super::*;

    /// Detect whether to use Wayland or X11 at runtime
    fn use_wayland() -> bool {
        std::env::var_os("WAYLAND_DISPLAY").is_some()
    }

    /// Linux overlay that wraps either Wayland or X11 backend
    pub enum LinuxOverlay {
        Wayland(wayland::WaylandOverlay),
        X11(x11::X11Overlay),
    }

    impl OverlayPlatform for LinuxOverlay {
        fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
            if use_wayland() {
                wayland::WaylandOverlay::new(config).map(LinuxOverlay::Wayland)
            } else {
                x11::X11Overlay::new(config).map(LinuxOverlay::X11)
            }
        }

        fn set_click_through(&mut self, enabled: bool) {
            match self {
                Self::Wayland(w) => w.set_click_through(enabled),
                Self::X11(x) => x.set_click_through(enabled),
            }
        }
    }

    impl Surface for LinuxOverlay {
        fn width(&self) -> u32 {
            match self {
                Self::Wayland(w) => w.width(),
                Self::X11(x) => x.width(),
            }
        }

        fn height(&self) -> u32 {
            match self {
                Self::Wayland(w) => w.height(),
                Self::X11(x) => x.height(),
            }
        }

        fn poll_events(&mut self) -> bool {
            match self {
                Self::Wayland(w) => w.poll_events(),
                Self::X11(x) => x.poll_events(),
            }
        }

        fn present(&mut self, pixels: &[u8]) {
            match self {
                Self::Wayland(w) => w.present(pixels),
                Self::X11(x) => x.present(pixels),
            }
        }
    }
}

#[cfg(not(any(all(unix, not(target_os = "macos")), target_os = "windows")))]
mod unsupported {
    use super::*;

    /// Placeholder for targets without a native backend; creation always fails
    pub enum UnsupportedOverlay {}

    impl OverlayPlatform for UnsupportedOverlay {
        fn new(_config: OverlayConfig) -> Result<Self, PlatformError> {
            Err(PlatformError::Other(format!(
                "no overlay backend for {}",
                std::env::consts::OS
            )))
        }

        fn set_click_through(&mut self, _enabled: bool) {
            match *self {}
        }
    }

    impl Surface for UnsupportedOverlay {
        fn width(&self) -> u32 {
            match *self {}
        }

        fn height(&self) -> u32 {
            match *self {}
        }

        fn poll_events(&mut self) -> bool {
            match *self {}
        }

        fn present(&mut self, _pixels: &[u8]) {
            match *self {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_follows_surface_settings() {
        let settings = SurfaceSettings {
            x: 10,
            y: 20,
            width: 800,
            height: 600,
            namespace: "hud-test".to_string(),
            click_through: false,
            ..Default::default()
        };
        let config = OverlayConfig::from(&settings);

        assert_eq!((config.x, config.y), (10, 20));
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.namespace, "hud-test");
        assert!(!config.click_through);
    }
}
