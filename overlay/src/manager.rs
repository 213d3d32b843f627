//! Wiring of the HUD onto the native overlay window
//!
//! The window and the drawing context are built by a factory that runs on the
//! render thread, so thread-affine handles (HWNDs, Wayland queues) are created
//! on the thread that uses them.

use gsi_hud_types::HudConfig;

use crate::controller::OverlayController;
use crate::error::SurfaceInitError;
use crate::overlays::HudOverlay;
use crate::platform::{NativeOverlay, OverlayConfig, OverlayPlatform, Surface};
use crate::renderer::SkiaContext;
use crate::telemetry::TelemetryReader;

/// Spawn the HUD on a native overlay window sized by `config.surface`
pub fn spawn_hud_overlay(
    config: &HudConfig,
    telemetry: TelemetryReader,
) -> Result<OverlayController, SurfaceInitError> {
    let window_config = OverlayConfig::from(&config.surface);
    let render = config.render.clone();

    let factory = move || {
        let platform = NativeOverlay::new(window_config)?;
        // The compositor may have picked a different size than requested
        let context = SkiaContext::new(platform.width(), platform.height(), &render)?;
        Ok((context, platform))
    };

    let handler = HudOverlay::new(telemetry, config.layout.clone());
    OverlayController::spawn(
        config.surface.clone(),
        config.render.clone(),
        factory,
        handler,
    )
}
