//! GSI HUD: draws health, armor and ammo on a click-through overlay above the game

mod config;
mod feed;
mod logging;

use clap::Parser;
use gsi_hud_overlay::{SurfaceState, TelemetryStore, spawn_hud_overlay};
use gsi_hud_types::HudConfig;

use crate::config::{HudConfigExt, SurfaceOverrides};
use crate::feed::DemoFeed;

#[derive(Parser, Debug)]
#[command(version, about = "Game telemetry HUD overlay")]
struct Args {
    /// Overlay width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Overlay height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Target frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Drive the HUD from a scripted feed instead of the game
    #[arg(long)]
    demo: bool,

    /// Write the effective configuration back to disk
    #[arg(long)]
    save_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let _log_guard = logging::init();

    let mut config = HudConfig::load();
    config.apply_overrides(SurfaceOverrides {
        width: args.width,
        height: args.height,
        fps: args.fps,
    });
    if args.save_config
        && let Err(e) = config.save()
    {
        tracing::error!(error = ?e, "Could not save configuration");
    }

    let store = TelemetryStore::new();
    let mut controller = match spawn_hud_overlay(&config, store.reader()) {
        Ok(controller) => controller,
        Err(e) => {
            tracing::error!(error = %e, "Overlay thread could not be started");
            return;
        }
    };

    let _feed = if args.demo {
        match DemoFeed::spawn(store) {
            Ok(feed) => Some(feed),
            Err(e) => {
                tracing::warn!(error = %e, "Demo feed could not be started");
                None
            }
        }
    } else {
        tracing::info!("No telemetry source attached; pass --demo for scripted values");
        None
    };

    let mut state = controller.subscribe();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Ctrl-C handler failed");
            }
            tracing::info!("Shutting down");
        }
        _ = state.wait_for(|s| *s == SurfaceState::Disposed) => {
            tracing::info!("Overlay closed");
        }
    }

    controller.dispose();
}
