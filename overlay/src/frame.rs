//! Per-frame drawing scope
//!
//! A [`Frame`] brackets one scene on a drawing context: it clears and begins
//! the scene when created and ends it when dropped, so every exit path
//! (including a panicking composer) leaves the context ready for the next
//! frame. Primitives resolve their brushes and fonts through the resource
//! cache. A primitive whose resource cannot be created is skipped and the rest
//! of the frame is still drawn.

use gsi_hud_types::{Color, RenderSettings};

use crate::context::{CrosshairStyle, DrawingContext, FontDesc};
use crate::error::ResourceError;
use crate::resources::ResourceCache;

/// Stroke width used for lines and boxes unless a caller asks otherwise
pub const DEFAULT_STROKE: f32 = 2.0;

/// Stroke width used for circles and filled boxes with an outline
pub const THIN_STROKE: f32 = 1.0;

/// Offset of the two outline passes drawn under outlined text
const TEXT_OUTLINE_OFFSET: f32 = 1.0;

/// Outline drawn around a box, on top of the box's own stroke
const BOX_OUTLINE_WIDTH: f32 = 2.0;

/// Text style flags shared by every text primitive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
}

impl TextStyle {
    pub const REGULAR: Self = Self {
        bold: false,
        italic: false,
    };
    pub const BOLD: Self = Self {
        bold: true,
        italic: false,
    };
}

/// One scene on a drawing context
pub struct Frame<'a, C: DrawingContext> {
    context: &'a mut C,
    resources: &'a mut ResourceCache<C>,
    settings: &'a RenderSettings,
    skipped: usize,
}

impl<'a, C: DrawingContext> Frame<'a, C> {
    /// Clear the target and open a scene
    pub fn begin(
        context: &'a mut C,
        resources: &'a mut ResourceCache<C>,
        settings: &'a RenderSettings,
    ) -> Self {
        context.clear_scene();
        context.begin_scene();
        Self {
            context,
            resources,
            settings,
            skipped: 0,
        }
    }

    pub fn width(&self) -> f32 {
        self.context.size().0 as f32
    }

    pub fn height(&self) -> f32 {
        self.context.size().1 as f32
    }

    /// Primitives skipped so far because a resource could not be created
    pub fn skipped_draws(&self) -> usize {
        self.skipped
    }

    fn skip(&mut self, primitive: &'static str, err: ResourceError) {
        self.skipped += 1;
        tracing::debug!(primitive, error = %err, "Skipped draw");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shapes
    // ─────────────────────────────────────────────────────────────────────────

    pub fn draw_line(
        &mut self,
        from_x: f32,
        from_y: f32,
        to_x: f32,
        to_y: f32,
        color: Color,
        stroke: f32,
    ) {
        match self.resources.brush(self.context, color) {
            Ok(brush) => self
                .context
                .draw_line(&brush, from_x, from_y, to_x, to_y, stroke),
            Err(err) => self.skip("line", err),
        }
    }

    /// Stroke the border of the box at (x, y) of the given size
    pub fn draw_box(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        stroke: f32,
    ) {
        match self.resources.brush(self.context, color) {
            Ok(brush) => self
                .context
                .draw_rect(&brush, x, y, x + width, y + height, stroke),
            Err(err) => self.skip("box", err),
        }
    }

    /// Stroke only the four corners of the box at (x, y)
    pub fn draw_box_edge(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        stroke: f32,
    ) {
        match self.resources.brush(self.context, color) {
            Ok(brush) => self
                .context
                .draw_rect_edges(&brush, x, y, x + width, y + height, stroke),
            Err(err) => self.skip("box edge", err),
        }
    }

    pub fn draw_filled_box(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        match self.resources.brush(self.context, color) {
            Ok(brush) => self.context.fill_rect(&brush, x, y, x + width, y + height),
            Err(err) => self.skip("filled box", err),
        }
    }

    /// Box border in `color` with a wider `outline` border underneath
    pub fn draw_outline_box(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        outline: Color,
        stroke: f32,
    ) {
        self.draw_box(x, y, width, height, outline, stroke + BOX_OUTLINE_WIDTH);
        self.draw_box(x, y, width, height, color, stroke);
    }

    /// Filled box with an `outline` border drawn over the fill
    pub fn draw_fill_outline_box(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        outline: Color,
        fill: Color,
        stroke: f32,
    ) {
        self.draw_filled_box(x, y, width, height, fill);
        self.draw_box(x, y, width, height, outline, stroke);
    }

    pub fn draw_rounded_box(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        color: Color,
        stroke: f32,
    ) {
        match self.resources.brush(self.context, color) {
            Ok(brush) => {
                self.context
                    .draw_rounded_rect(&brush, x, y, x + width, y + height, radius, stroke)
            }
            Err(err) => self.skip("rounded box", err),
        }
    }

    pub fn draw_circle(&mut self, x: f32, y: f32, radius: f32, color: Color, stroke: f32) {
        match self.resources.brush(self.context, color) {
            Ok(brush) => self.context.draw_circle(&brush, x, y, radius, stroke),
            Err(err) => self.skip("circle", err),
        }
    }

    pub fn draw_crosshair(
        &mut self,
        style: CrosshairStyle,
        x: f32,
        y: f32,
        size: f32,
        color: Color,
        stroke: f32,
    ) {
        match self.resources.brush(self.context, color) {
            Ok(brush) => self
                .context
                .draw_crosshair(&brush, style, x, y, size, stroke),
            Err(err) => self.skip("crosshair", err),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Text
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw `text` with its top-left corner at (x, y)
    pub fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        color: Color,
        style: TextStyle,
    ) {
        let desc = FontDesc::new(&self.settings.font_family, size)
            .bold(style.bold)
            .italic(style.italic);
        let font = match self.resources.font(self.context, &desc) {
            Ok(font) => font,
            Err(err) => return self.skip("text", err),
        };
        match self.resources.brush(self.context, color) {
            Ok(brush) => self.context.draw_text(&font, &brush, x, y, text),
            Err(err) => self.skip("text", err),
        }
    }

    /// Draw `text` twice in `outline`, one pixel down-left and down-right,
    /// then once in `color` at (x, y)
    pub fn draw_text_with_outline(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        color: Color,
        outline: Color,
        style: TextStyle,
    ) {
        let outline_y = y + TEXT_OUTLINE_OFFSET;
        self.draw_text(text, x - TEXT_OUTLINE_OFFSET, outline_y, size, outline, style);
        self.draw_text(text, x + TEXT_OUTLINE_OFFSET, outline_y, size, outline, style);
        self.draw_text(text, x, y, size, color, style);
    }

    /// Draw `text` over a box of `background` sized to the text
    pub fn draw_text_with_background(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        color: Color,
        background: Color,
        style: TextStyle,
    ) {
        let desc = FontDesc::new(&self.settings.background_font_family, size)
            .bold(style.bold)
            .italic(style.italic);
        let font = match self.resources.font(self.context, &desc) {
            Ok(font) => font,
            Err(err) => return self.skip("background text", err),
        };
        let brush = match self.resources.brush(self.context, color) {
            Ok(brush) => brush,
            Err(err) => return self.skip("background text", err),
        };
        match self.resources.brush(self.context, background) {
            Ok(bg) => self
                .context
                .draw_text_with_background(&font, &brush, &bg, x, y, text),
            Err(err) => self.skip("background text", err),
        }
    }
}

impl<C: DrawingContext> Drop for Frame<'_, C> {
    fn drop(&mut self) {
        self.context.end_scene();
        if self.skipped > 0 {
            tracing::debug!(skipped = self.skipped, "Frame finished with skipped draws");
        }
    }
}
