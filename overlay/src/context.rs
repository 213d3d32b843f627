//! The drawing-context seam
//!
//! Everything above this module (resource cache, frame primitives, the HUD
//! composer) talks to a [`DrawingContext`]; everything below it is a concrete
//! rasterizer. [`crate::renderer::SkiaContext`] is the production backend,
//! tests substitute a recording context.

use std::rc::Rc;

use gsi_hud_types::Color;

use crate::error::ResourceError;

/// Description of a text font.
///
/// Two descriptions select the same cached font only when every field is
/// equal. `size` is compared by exact value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontDesc<'a> {
    pub family: &'a str,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub word_wrap: bool,
}

impl<'a> FontDesc<'a> {
    pub fn new(family: &'a str, size: f32) -> Self {
        Self {
            family,
            size,
            bold: false,
            italic: false,
            word_wrap: false,
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn word_wrap(mut self, word_wrap: bool) -> Self {
        self.word_wrap = word_wrap;
        self
    }
}

/// Crosshair shapes. `size` is the half-length of each arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrosshairStyle {
    /// Filled dot of radius `size`
    Dot,
    /// Horizontal and vertical arms
    #[default]
    Plus,
    /// Plus with a filled center dot
    Cross,
    /// Plus with the inner half of every arm left open
    Gap,
    /// Arms rotated 45 degrees
    Diagonal,
}

/// A cached resource handed back to its context on disposal
#[derive(Debug)]
pub enum Resource<B, F> {
    Brush(Rc<B>),
    Font(Rc<F>),
}

/// Immediate-mode 2D drawing backend bound to one overlay surface.
///
/// Coordinates are surface pixels with the origin at the top-left corner.
/// Text is anchored at the top-left of its first line.
pub trait DrawingContext {
    type Brush;
    type Font;

    /// Surface size in pixels
    fn size(&self) -> (u32, u32);

    /// Match a new surface size. The previous contents are discarded.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError>;

    fn create_brush(&mut self, color: Color) -> Result<Self::Brush, ResourceError>;

    fn create_font(&mut self, desc: &FontDesc<'_>) -> Result<Self::Font, ResourceError>;

    /// Free backend state held for a cached resource
    fn release(&mut self, resource: Resource<Self::Brush, Self::Font>);

    /// Reset every pixel to fully transparent
    fn clear_scene(&mut self);

    fn begin_scene(&mut self);

    fn end_scene(&mut self);

    /// Pixels of the last finished scene, RGBA premultiplied, row-major
    fn frame_pixels(&self) -> &[u8];

    fn draw_line(
        &mut self,
        brush: &Self::Brush,
        from_x: f32,
        from_y: f32,
        to_x: f32,
        to_y: f32,
        stroke: f32,
    );

    fn draw_rect(
        &mut self,
        brush: &Self::Brush,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        stroke: f32,
    );

    fn fill_rect(&mut self, brush: &Self::Brush, left: f32, top: f32, right: f32, bottom: f32);

    /// Stroke only the corners of a rectangle, as brackets
    fn draw_rect_edges(
        &mut self,
        brush: &Self::Brush,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        stroke: f32,
    );

    fn draw_rounded_rect(
        &mut self,
        brush: &Self::Brush,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        radius: f32,
        stroke: f32,
    );

    fn draw_circle(&mut self, brush: &Self::Brush, x: f32, y: f32, radius: f32, stroke: f32);

    fn draw_crosshair(
        &mut self,
        brush: &Self::Brush,
        style: CrosshairStyle,
        x: f32,
        y: f32,
        size: f32,
        stroke: f32,
    );

    fn draw_text(&mut self, font: &Self::Font, brush: &Self::Brush, x: f32, y: f32, text: &str);

    /// Draw text over a filled box sized to the text extent
    fn draw_text_with_background(
        &mut self,
        font: &Self::Font,
        brush: &Self::Brush,
        background: &Self::Brush,
        x: f32,
        y: f32,
        text: &str,
    );
}
