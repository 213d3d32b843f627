//! Recording doubles for the drawing context and the surface

use std::sync::{Arc, Mutex, PoisonError};

use gsi_hud_types::Color;

use crate::context::{CrosshairStyle, DrawingContext, FontDesc, Resource};
use crate::error::ResourceError;
use crate::platform::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Brush,
    Font,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBrush(Color),
    CreateFont {
        family: String,
        size: f32,
        bold: bool,
        italic: bool,
    },
    Release(ResourceKind),
    ClearScene,
    BeginScene,
    EndScene,
    Line {
        color: Color,
        from: (f32, f32),
        to: (f32, f32),
        stroke: f32,
    },
    Rect {
        color: Color,
        ltrb: [f32; 4],
        stroke: f32,
    },
    FillRect {
        color: Color,
        ltrb: [f32; 4],
    },
    RectEdges {
        color: Color,
        ltrb: [f32; 4],
        stroke: f32,
    },
    RoundedRect {
        color: Color,
        ltrb: [f32; 4],
        radius: f32,
    },
    Circle {
        color: Color,
        center: (f32, f32),
        radius: f32,
        stroke: f32,
    },
    Crosshair {
        color: Color,
        style: CrosshairStyle,
        center: (f32, f32),
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        color: Color,
        family: String,
        size: f32,
    },
    TextWithBackground {
        text: String,
        x: f32,
        y: f32,
        color: Color,
        background: Color,
        family: String,
    },
    Resize(u32, u32),
    Present(usize),
    ContextDropped,
    SurfaceDropped,
}

/// Shared, thread-safe call log
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    /// Text draws in issue order
    pub fn texts(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Text { .. }))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedFont {
    pub family: String,
    pub size: f32,
}

/// Drawing context that records every call instead of rasterizing
pub struct RecordingContext {
    width: u32,
    height: u32,
    log: CallLog,
    failing_family: Option<String>,
    failing_color: Option<Color>,
    pixels: Vec<u8>,
}

impl RecordingContext {
    pub fn new(width: u32, height: u32, log: CallLog) -> Self {
        Self {
            width,
            height,
            log,
            failing_family: None,
            failing_color: None,
            pixels: vec![0; 16],
        }
    }

    pub fn fail_fonts_named(&mut self, family: &str) {
        self.failing_family = Some(family.to_string());
    }

    pub fn fail_brush(&mut self, color: Color) {
        self.failing_color = Some(color);
    }

    pub fn clear_failures(&mut self) {
        self.failing_family = None;
        self.failing_color = None;
    }
}

impl Drop for RecordingContext {
    fn drop(&mut self) {
        self.log.push(Call::ContextDropped);
    }
}

impl DrawingContext for RecordingContext {
    type Brush = Color;
    type Font = RecordedFont;

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        self.log.push(Call::Resize(width, height));
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn create_brush(&mut self, color: Color) -> Result<Color, ResourceError> {
        if self.failing_color == Some(color) {
            return Err(ResourceError::Backend("brush rejected".to_string()));
        }
        self.log.push(Call::CreateBrush(color));
        Ok(color)
    }

    fn create_font(&mut self, desc: &FontDesc<'_>) -> Result<RecordedFont, ResourceError> {
        if !(desc.size.is_finite() && desc.size > 0.0) {
            return Err(ResourceError::InvalidFontSize { size: desc.size });
        }
        self.log.push(Call::CreateFont {
            family: desc.family.to_string(),
            size: desc.size,
            bold: desc.bold,
            italic: desc.italic,
        });
        if self.failing_family.as_deref() == Some(desc.family) {
            return Err(ResourceError::FontNotFound {
                family: desc.family.to_string(),
            });
        }
        Ok(RecordedFont {
            family: desc.family.to_string(),
            size: desc.size,
        })
    }

    fn release(&mut self, resource: Resource<Color, RecordedFont>) {
        let kind = match resource {
            Resource::Brush(_) => ResourceKind::Brush,
            Resource::Font(_) => ResourceKind::Font,
        };
        self.log.push(Call::Release(kind));
    }

    fn clear_scene(&mut self) {
        self.log.push(Call::ClearScene);
    }

    fn begin_scene(&mut self) {
        self.log.push(Call::BeginScene);
    }

    fn end_scene(&mut self) {
        self.log.push(Call::EndScene);
    }

    fn frame_pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn draw_line(
        &mut self,
        brush: &Color,
        from_x: f32,
        from_y: f32,
        to_x: f32,
        to_y: f32,
        stroke: f32,
    ) {
        self.log.push(Call::Line {
            color: *brush,
            from: (from_x, from_y),
            to: (to_x, to_y),
            stroke,
        });
    }

    fn draw_rect(
        &mut self,
        brush: &Color,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        stroke: f32,
    ) {
        self.log.push(Call::Rect {
            color: *brush,
            ltrb: [left, top, right, bottom],
            stroke,
        });
    }

    fn fill_rect(&mut self, brush: &Color, left: f32, top: f32, right: f32, bottom: f32) {
        self.log.push(Call::FillRect {
            color: *brush,
            ltrb: [left, top, right, bottom],
        });
    }

    fn draw_rect_edges(
        &mut self,
        brush: &Color,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        stroke: f32,
    ) {
        self.log.push(Call::RectEdges {
            color: *brush,
            ltrb: [left, top, right, bottom],
            stroke,
        });
    }

    fn draw_rounded_rect(
        &mut self,
        brush: &Color,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        radius: f32,
        _stroke: f32,
    ) {
        self.log.push(Call::RoundedRect {
            color: *brush,
            ltrb: [left, top, right, bottom],
            radius,
        });
    }

    fn draw_circle(&mut self, brush: &Color, x: f32, y: f32, radius: f32, stroke: f32) {
        self.log.push(Call::Circle {
            color: *brush,
            center: (x, y),
            radius,
            stroke,
        });
    }

    fn draw_crosshair(
        &mut self,
        brush: &Color,
        style: CrosshairStyle,
        x: f32,
        y: f32,
        _size: f32,
        _stroke: f32,
    ) {
        self.log.push(Call::Crosshair {
            color: *brush,
            style,
            center: (x, y),
        });
    }

    fn draw_text(&mut self, font: &RecordedFont, brush: &Color, x: f32, y: f32, text: &str) {
        self.log.push(Call::Text {
            text: text.to_string(),
            x,
            y,
            color: *brush,
            family: font.family.clone(),
            size: font.size,
        });
    }

    fn draw_text_with_background(
        &mut self,
        font: &RecordedFont,
        brush: &Color,
        background: &Color,
        x: f32,
        y: f32,
        text: &str,
    ) {
        self.log.push(Call::TextWithBackground {
            text: text.to_string(),
            x,
            y,
            color: *brush,
            background: *background,
            family: font.family.clone(),
        });
    }
}

/// Surface double that stays open until `close_after` polls have passed
pub struct RecordingSurface {
    width: u32,
    height: u32,
    log: CallLog,
    close_after: Option<usize>,
    resize_at: Option<(usize, u32, u32)>,
    polls: usize,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32, log: CallLog) -> Self {
        Self {
            width,
            height,
            log,
            close_after: None,
            resize_at: None,
            polls: 0,
        }
    }

    pub fn closing_after(mut self, polls: usize) -> Self {
        self.close_after = Some(polls);
        self
    }

    /// Report a new size from the `poll`-th poll onwards
    pub fn resizing_at(mut self, poll: usize, width: u32, height: u32) -> Self {
        self.resize_at = Some((poll, width, height));
        self
    }
}

impl Drop for RecordingSurface {
    fn drop(&mut self) {
        self.log.push(Call::SurfaceDropped);
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn poll_events(&mut self) -> bool {
        self.polls += 1;
        if let Some((poll, width, height)) = self.resize_at
            && self.polls >= poll
        {
            self.width = width;
            self.height = height;
        }
        self.close_after.is_none_or(|limit| self.polls <= limit)
    }

    fn present(&mut self, pixels: &[u8]) {
        self.log.push(Call::Present(pixels.len()));
    }
}
