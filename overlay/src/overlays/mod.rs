//! Frame composers
//!
//! A composer is handed to the overlay controller and lives on the render
//! thread from then on. The controller calls [`FrameHandler::setup`] once,
//! after the drawing context exists and before the first frame, then
//! [`FrameHandler::draw`] once per tick with a freshly begun [`Frame`].

mod hud;

pub use hud::HudOverlay;

use crate::context::DrawingContext;
use crate::frame::Frame;
use crate::resources::ResourceCache;

/// Per-frame drawing routine driven by the overlay controller
///
/// Implementors must be `Send` because they are moved onto the render thread;
/// the drawing context itself never leaves that thread.
pub trait FrameHandler<C: DrawingContext>: Send + 'static {
    /// One-time hook before the first frame.
    ///
    /// May pre-warm `resources`. The default only acknowledges the call.
    fn setup(&mut self, context: &mut C, resources: &mut ResourceCache<C>) {
        let _ = (context, resources);
        tracing::info!("Overlay graphics set up");
    }

    /// Compose one frame. Clearing, beginning and ending the scene are handled
    /// by `frame`.
    fn draw(&mut self, frame: &mut Frame<'_, C>);
}
