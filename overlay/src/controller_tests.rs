//! Tests for the overlay controller lifecycle
//!
//! Runs the real render thread against recording doubles for the drawing
//! context and the surface.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gsi_hud_types::overlay_colors::{BLUE, WHITE};
use gsi_hud_types::{RenderSettings, SurfaceSettings};

use crate::controller::{OverlayController, SurfaceState};
use crate::error::SurfaceInitError;
use crate::frame::{DEFAULT_STROKE, Frame, TextStyle};
use crate::overlays::FrameHandler;
use crate::resources::ResourceCache;
use crate::testing::{Call, CallLog, RecordingContext, RecordingSurface};

const WAIT: Duration = Duration::from_secs(5);

/// Handler that notes its callbacks and draws one text and one box
struct NotingHandler {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl FrameHandler<RecordingContext> for NotingHandler {
    fn setup(
        &mut self,
        _context: &mut RecordingContext,
        resources: &mut ResourceCache<RecordingContext>,
    ) {
        assert!(resources.is_empty());
        self.events.lock().unwrap().push("setup");
    }

    fn draw(&mut self, frame: &mut Frame<'_, RecordingContext>) {
        self.events.lock().unwrap().push("draw");
        frame.draw_text("42", 10.0, 10.0, 48.0, WHITE, TextStyle::BOLD);
        frame.draw_box(100.0, 100.0, 20.0, 20.0, BLUE, DEFAULT_STROKE);
    }
}

fn fast_settings() -> SurfaceSettings {
    SurfaceSettings {
        fps: 200,
        ..Default::default()
    }
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn spawn_recording(
    log: &CallLog,
    surface: RecordingSurface,
    events: Arc<Mutex<Vec<&'static str>>>,
) -> OverlayController {
    let context_log = log.clone();
    OverlayController::spawn(
        fast_settings(),
        RenderSettings::default(),
        move || Ok((RecordingContext::new(1920, 1080, context_log), surface)),
        NotingHandler { events },
    )
    .unwrap()
}

#[test]
fn teardown_releases_resources_then_context_then_surface() {
    let log = CallLog::default();
    let events = Arc::default();
    let surface = RecordingSurface::new(1920, 1080, log.clone());
    let mut controller = spawn_recording(&log, surface, events);

    assert!(wait_until(|| controller.frames_rendered() >= 3));
    assert_eq!(controller.state(), SurfaceState::Active);
    controller.dispose();
    assert_eq!(controller.state(), SurfaceState::Disposed);

    let calls = log.calls();
    let created = log.count(|c| matches!(c, Call::CreateBrush(_) | Call::CreateFont { .. }));
    let released: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Call::Release(_)))
        .map(|(i, _)| i)
        .collect();
    let context_dropped = calls.iter().position(|c| *c == Call::ContextDropped).unwrap();
    let surface_dropped = calls.iter().position(|c| *c == Call::SurfaceDropped).unwrap();

    // One font and two brushes, each created once across every frame
    assert_eq!(created, 3);
    assert_eq!(released.len(), created);
    assert!(released.iter().all(|&i| i < context_dropped));
    assert!(context_dropped < surface_dropped);
    assert_eq!(surface_dropped, calls.len() - 1);
}

#[test]
fn second_dispose_is_a_no_op() {
    let log = CallLog::default();
    let surface = RecordingSurface::new(800, 600, log.clone());
    let mut controller = spawn_recording(&log, surface, Arc::default());

    assert!(wait_until(|| controller.state() == SurfaceState::Active));
    controller.dispose();
    let after_first = log.calls();

    controller.dispose();
    drop(controller);
    assert_eq!(log.calls(), after_first);
    assert_eq!(log.count(|c| *c == Call::ContextDropped), 1);
    assert_eq!(log.count(|c| *c == Call::SurfaceDropped), 1);
}

#[test]
fn setup_runs_once_before_first_draw() {
    let log = CallLog::default();
    let events: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let surface = RecordingSurface::new(1920, 1080, log.clone());
    let mut controller = spawn_recording(&log, surface, Arc::clone(&events));

    assert!(wait_until(|| controller.frames_rendered() >= 2));
    controller.dispose();

    let events = events.lock().unwrap();
    assert_eq!(events[0], "setup");
    assert_eq!(events.iter().filter(|e| **e == "setup").count(), 1);
    assert!(events[1..].iter().all(|e| *e == "draw"));
}

#[test]
fn every_frame_is_ended_and_presented() {
    let log = CallLog::default();
    let surface = RecordingSurface::new(1920, 1080, log.clone()).closing_after(5);
    let controller = spawn_recording(&log, surface, Arc::default());

    assert!(wait_until(|| controller.state() == SurfaceState::Disposed));
    assert_eq!(controller.frames_rendered(), 5);
    assert_eq!(log.count(|c| *c == Call::BeginScene), 5);
    assert_eq!(log.count(|c| *c == Call::EndScene), 5);
    assert_eq!(log.count(|c| matches!(c, Call::Present(_))), 5);
}

#[test]
fn failing_font_does_not_stop_the_pump() {
    let log = CallLog::default();
    let context_log = log.clone();
    let surface = RecordingSurface::new(1920, 1080, log.clone()).closing_after(4);
    let controller = OverlayController::spawn(
        fast_settings(),
        RenderSettings::default(),
        move || {
            let mut context = RecordingContext::new(1920, 1080, context_log);
            context.fail_fonts_named(&RenderSettings::default().font_family);
            Ok((context, surface))
        },
        NotingHandler {
            events: Arc::default(),
        },
    )
    .unwrap();

    assert!(wait_until(|| controller.state() == SurfaceState::Disposed));
    assert!(log.texts().is_empty());
    assert_eq!(log.count(|c| matches!(c, Call::Rect { .. })), 4);
    assert_eq!(log.count(|c| *c == Call::EndScene), 4);
    // Not cached on failure, so every frame retries
    assert_eq!(log.count(|c| matches!(c, Call::CreateFont { .. })), 4);
}

/// Handler that records the frame size it was given
struct SizeHandler {
    sizes: Arc<Mutex<Vec<(f32, f32)>>>,
}

impl FrameHandler<RecordingContext> for SizeHandler {
    fn draw(&mut self, frame: &mut Frame<'_, RecordingContext>) {
        self.sizes.lock().unwrap().push((frame.width(), frame.height()));
    }
}

#[test]
fn context_follows_surface_resize() {
    let log = CallLog::default();
    let context_log = log.clone();
    let sizes: Arc<Mutex<Vec<(f32, f32)>>> = Arc::default();
    let surface = RecordingSurface::new(1920, 1080, log.clone())
        .resizing_at(3, 2560, 1440)
        .closing_after(5);
    let controller = OverlayController::spawn(
        fast_settings(),
        RenderSettings::default(),
        move || Ok((RecordingContext::new(1920, 1080, context_log), surface)),
        SizeHandler {
            sizes: Arc::clone(&sizes),
        },
    )
    .unwrap();

    assert!(wait_until(|| controller.state() == SurfaceState::Disposed));
    assert_eq!(
        *sizes.lock().unwrap(),
        vec![
            (1920.0, 1080.0),
            (1920.0, 1080.0),
            (2560.0, 1440.0),
            (2560.0, 1440.0),
            (2560.0, 1440.0),
        ]
    );
    assert_eq!(log.count(|c| matches!(c, Call::Resize(..))), 1);

    let calls = log.calls();
    let resized = calls.iter().position(|c| *c == Call::Resize(2560, 1440)).unwrap();
    let begins_before = calls[..resized].iter().filter(|c| **c == Call::BeginScene).count();
    assert_eq!(begins_before, 2);
}

/// Handler whose draw callback always panics after creating a resource
struct PanickingHandler;

impl FrameHandler<RecordingContext> for PanickingHandler {
    fn draw(&mut self, frame: &mut Frame<'_, RecordingContext>) {
        frame.draw_filled_box(0.0, 0.0, 4.0, 4.0, BLUE);
        panic!("composer failed");
    }
}

#[test]
fn panicking_draw_still_tears_down_in_order() {
    let log = CallLog::default();
    let context_log = log.clone();
    let surface = RecordingSurface::new(1920, 1080, log.clone());
    let mut controller = OverlayController::spawn(
        fast_settings(),
        RenderSettings::default(),
        move || Ok((RecordingContext::new(1920, 1080, context_log), surface)),
        PanickingHandler,
    )
    .unwrap();

    assert!(wait_until(|| controller.state() == SurfaceState::Disposed));
    let calls = log.calls();
    let released = calls.iter().position(|c| matches!(c, Call::Release(_))).unwrap();
    let context_dropped = calls.iter().position(|c| *c == Call::ContextDropped).unwrap();
    let surface_dropped = calls.iter().position(|c| *c == Call::SurfaceDropped).unwrap();
    assert!(released < context_dropped);
    assert!(context_dropped < surface_dropped);
    assert_eq!(log.count(|c| *c == Call::EndScene), 1);

    controller.dispose();
    assert_eq!(controller.state(), SurfaceState::Disposed);
    assert_eq!(log.count(|c| *c == Call::SurfaceDropped), 1);
}

#[test]
fn factory_error_leaves_controller_creating() {
    let mut controller = OverlayController::spawn(
        fast_settings(),
        RenderSettings::default(),
        || -> Result<(RecordingContext, RecordingSurface), SurfaceInitError> {
            Err(SurfaceInitError::Context("no display".to_string()))
        },
        NotingHandler {
            events: Arc::default(),
        },
    )
    .unwrap();

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(controller.state(), SurfaceState::Creating);
    assert_eq!(controller.frames_rendered(), 0);

    controller.dispose();
    assert_eq!(controller.state(), SurfaceState::Disposed);
}

#[tokio::test]
async fn subscribers_observe_disposal() {
    let log = CallLog::default();
    let surface = RecordingSurface::new(640, 480, log.clone()).closing_after(2);
    let controller = spawn_recording(&log, surface, Arc::default());
    let mut state = controller.subscribe();

    let reached = tokio::time::timeout(WAIT, state.wait_for(|s| *s == SurfaceState::Disposed))
        .await
        .expect("controller never reached Disposed");
    assert!(reached.is_ok());
    assert_eq!(controller.frames_rendered(), 2);
}
