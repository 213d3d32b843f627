//! GSI HUD Overlay Library
//!
//! Draws live player telemetry on a transparent, click-through window above
//! the game.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    manager                          │
//! │     spawn_hud_overlay (native window + skia)        │
//! ├─────────────────────────────────────────────────────┤
//! │                    controller                       │
//! │   OverlayController: render thread, frame pump,     │
//! │   lifecycle state, ordered teardown                 │
//! ├─────────────────────────────────────────────────────┤
//! │                    overlays/                        │
//! │   HudOverlay (health, armor, ammo)  ◀── telemetry   │
//! ├─────────────────────────────────────────────────────┤
//! │                 frame + resources                   │
//! │   Frame primitives, ResourceCache (brushes, fonts)  │
//! ├─────────────────────────────────────────────────────┤
//! │                 context / renderer                  │
//! │   DrawingContext trait, SkiaContext                 │
//! │   (tiny-skia + cosmic-text)                         │
//! ├─────────────────────────────────────────────────────┤
//! │                    platform/                        │
//! │            wayland, x11, windows                    │
//! │            (OS window management)                   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod controller;
pub mod error;
pub mod frame;
pub mod manager;
pub mod overlays;
pub mod platform;
pub mod renderer;
pub mod resources;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
mod controller_tests;
#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use context::{CrosshairStyle, DrawingContext, FontDesc, Resource};
pub use controller::{OverlayController, SurfaceState};
pub use error::{ResourceError, SurfaceInitError};
pub use frame::{Frame, TextStyle};
pub use manager::spawn_hud_overlay;
pub use overlays::{FrameHandler, HudOverlay};
pub use platform::{NativeOverlay, OverlayConfig, OverlayPlatform, PlatformError, Surface};
pub use renderer::SkiaContext;
pub use resources::ResourceCache;
pub use telemetry::{TelemetryReader, TelemetryStore};
