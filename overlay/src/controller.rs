//! Overlay surface lifecycle and frame pump
//!
//! The controller owns one render thread. Everything that is affine to the
//! window (the surface, the drawing context, the resource cache and the frame
//! composer) is created and dropped on that thread; only commands and the
//! lifecycle state cross the boundary.
//!
//! ```text
//!  Uninitialized ──spawn──▶ Creating ──factory ok──▶ Active ──dispose / close──▶ Disposed
//!                              │
//!                              └─ factory error: stays Creating, no frames
//! ```
//!
//! Teardown always runs in the same order on the render thread: cached
//! resources are released back to the context, then the context is dropped,
//! then the surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use gsi_hud_types::{RenderSettings, SurfaceSettings};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tokio::sync::watch;

use crate::context::DrawingContext;
use crate::error::SurfaceInitError;
use crate::frame::Frame;
use crate::overlays::FrameHandler;
use crate::platform::{Surface, lower_thread_priority};
use crate::resources::ResourceCache;

const RENDER_THREAD_NAME: &str = "gsi-hud-overlay";

/// Lifecycle of the overlay surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    /// Render thread started, surface not (yet) created
    Creating,
    /// Frame pump running
    Active,
    Disposed,
}

/// Commands processed by the render thread between frames
#[derive(Debug)]
enum OverlayCommand {
    Shutdown,
}

/// Handle to the render thread
pub struct OverlayController {
    commands: UnboundedSender<OverlayCommand>,
    state: Arc<watch::Sender<SurfaceState>>,
    frames: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl OverlayController {
    /// Start the render thread.
    ///
    /// `factory` runs on the render thread and builds the drawing context and
    /// the surface there, which keeps thread-affine window handles on the
    /// thread that uses them. A factory error is logged and leaves the
    /// controller in [`SurfaceState::Creating`]; only a failure to start the
    /// thread itself is returned.
    pub fn spawn<C, S, F, H>(
        settings: SurfaceSettings,
        render: RenderSettings,
        factory: F,
        handler: H,
    ) -> Result<Self, SurfaceInitError>
    where
        C: DrawingContext + 'static,
        S: Surface + 'static,
        F: FnOnce() -> Result<(C, S), SurfaceInitError> + Send + 'static,
        H: FrameHandler<C>,
    {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(SurfaceState::Uninitialized);
        let state = Arc::new(state);
        let frames = Arc::new(AtomicU64::new(0));

        state.send_replace(SurfaceState::Creating);

        let pump = FramePump {
            settings,
            render,
            commands: rx,
            state: Arc::clone(&state),
            frames: Arc::clone(&frames),
        };

        let handle = thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || pump.run(factory, handler))
            .map_err(|e| {
                state.send_replace(SurfaceState::Uninitialized);
                SurfaceInitError::Spawn(e)
            })?;

        Ok(Self {
            commands,
            state,
            frames,
            handle: Some(handle),
        })
    }

    pub fn state(&self) -> SurfaceState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<SurfaceState> {
        self.state.subscribe()
    }

    /// Number of frames composed and presented so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Stop the frame pump and wait for the ordered teardown to finish.
    ///
    /// Calling this more than once is a no-op.
    pub fn dispose(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        // The thread may already be gone (init failure, surface closed)
        let _ = self.commands.send(OverlayCommand::Shutdown);
        if handle.join().is_err() {
            tracing::error!("Overlay render thread panicked");
        }

        self.state.send_replace(SurfaceState::Disposed);
        tracing::info!(frames = self.frames_rendered(), "Overlay controller disposed");
    }
}

impl Drop for OverlayController {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Render Thread
// ─────────────────────────────────────────────────────────────────────────────

struct FramePump {
    settings: SurfaceSettings,
    render: RenderSettings,
    commands: UnboundedReceiver<OverlayCommand>,
    state: Arc<watch::Sender<SurfaceState>>,
    frames: Arc<AtomicU64>,
}

impl FramePump {
    fn run<C, S, F, H>(mut self, factory: F, mut handler: H)
    where
        C: DrawingContext,
        S: Surface,
        F: FnOnce() -> Result<(C, S), SurfaceInitError>,
        H: FrameHandler<C>,
    {
        lower_thread_priority();

        let (context, surface) = match factory() {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(error = %e, "Overlay surface could not be created");
                return;
            }
        };
        let mut session = Session {
            resources: ResourceCache::new(),
            context: Some(context),
            surface: Some(surface),
            state: Arc::clone(&self.state),
        };
        let Session {
            resources,
            context: Some(context),
            surface: Some(surface),
            ..
        } = &mut session
        else {
            return;
        };

        handler.setup(context, resources);
        self.state.send_replace(SurfaceState::Active);
        tracing::info!(
            width = surface.width(),
            height = surface.height(),
            fps = self.settings.fps,
            "Overlay surface active"
        );

        self.pump(context, surface, resources, &mut handler);
    }

    fn pump<C, S, H>(
        &mut self,
        context: &mut C,
        surface: &mut S,
        resources: &mut ResourceCache<C>,
        handler: &mut H,
    ) where
        C: DrawingContext,
        S: Surface,
        H: FrameHandler<C>,
    {
        let interval = frame_interval(self.settings.fps);
        let mut meter = self.settings.measure_fps.then(FpsMeter::new);
        let mut next_frame = Instant::now();

        loop {
            match self.commands.try_recv() {
                Ok(OverlayCommand::Shutdown) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => {}
            }

            if !surface.poll_events() {
                tracing::info!("Overlay surface closed");
                return;
            }

            if sync_size(context, surface) {
                {
                    let mut frame = Frame::begin(context, resources, &self.render);
                    handler.draw(&mut frame);
                }
                surface.present(context.frame_pixels());
                self.frames.fetch_add(1, Ordering::Relaxed);

                if let Some(meter) = meter.as_mut() {
                    meter.tick();
                }
            }

            // Fixed-rate schedule; a late frame resets it instead of bursting
            next_frame += interval;
            let now = Instant::now();
            if next_frame > now {
                thread::sleep(next_frame - now);
            } else {
                next_frame = now;
            }
        }
    }
}

/// Resize the context to the surface if they differ. Returns false when the
/// context could not follow, in which case the frame is not presented.
fn sync_size<C: DrawingContext, S: Surface>(context: &mut C, surface: &S) -> bool {
    let (width, height) = (surface.width(), surface.height());
    if context.size() == (width, height) {
        return true;
    }
    match context.resize(width, height) {
        Ok(()) => {
            tracing::debug!(width, height, "Drawing context resized to surface");
            true
        }
        Err(e) => {
            tracing::warn!(width, height, error = %e, "Could not resize drawing context");
            false
        }
    }
}

/// Everything owned by the render thread once the surface exists.
///
/// Dropping it performs the ordered teardown, also when the composer panics:
/// cached resources, then the context, then the surface.
struct Session<C: DrawingContext, S> {
    resources: ResourceCache<C>,
    context: Option<C>,
    surface: Option<S>,
    state: Arc<watch::Sender<SurfaceState>>,
}

impl<C: DrawingContext, S> Drop for Session<C, S> {
    fn drop(&mut self) {
        let released = match self.context.as_mut() {
            Some(context) => self.resources.dispose(context),
            None => 0,
        };
        self.context = None;
        self.surface = None;
        self.state.send_replace(SurfaceState::Disposed);
        tracing::info!(released, "Overlay surface torn down");
    }
}

fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Logs the achieved frame rate once per second
struct FpsMeter {
    window_start: Instant,
    frames: u32,
}

impl FpsMeter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames as f64 / elapsed.as_secs_f64();
            tracing::debug!(fps = (fps * 10.0).round() / 10.0, "Overlay frame rate");
            self.frames = 0;
            self.window_start = Instant::now();
        }
    }
}
