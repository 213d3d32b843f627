//! Software drawing context using tiny-skia and cosmic-text
//!
//! All rendering is done on the CPU into a surface-sized RGBA pixmap which
//! the platform backend copies to the screen after every scene.
use std::collections::HashMap;

use cosmic_text::{
    fontdb, Attrs, Buffer, Color as CosmicColor, Family, FontSystem, LayoutGlyph, Metrics,
    Shaping, Style, SwashCache, SwashContent, Weight,
};
use gsi_hud_types::{Color, RenderSettings};
use tiny_skia::{
    FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::context::{CrosshairStyle, DrawingContext, FontDesc, Resource};
use crate::error::{ResourceError, SurfaceInitError};
use crate::utils::skia_color;

/// Maximum entries in the text shaping cache (LRU eviction when exceeded)
const TEXT_CACHE_MAX_ENTRIES: usize = 512;

/// Line height as a multiple of the font size
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Length of each corner bracket as a fraction of the side it sits on
const RECT_EDGE_FRACTION: f32 = 0.25;

/// Glyph coverage at or above which a pixel is set when text AA is off
const ALIASED_COVERAGE_THRESHOLD: u8 = 128;

/// Solid paint for shapes and text
pub struct SkiaBrush {
    paint: Paint<'static>,
    text_color: CosmicColor,
}

/// Resolved font: a family known to be installed plus shaping parameters
pub struct SkiaFont {
    id: u32,
    family: String,
    weight: Weight,
    style: Style,
    metrics: Metrics,
    word_wrap: bool,
}

/// Cached result of text shaping
struct CachedText {
    /// Pre-shaped glyphs, positioned relative to the text origin
    glyphs: Vec<(LayoutGlyph, f32)>,
    width: f32,
    height: f32,
    /// LRU tracking: incremented on each access
    last_used: u64,
}

/// Key for text cache: (text content, font id)
type TextCacheKey = (String, u32);

/// Drawing context that rasterizes into an owned pixmap
pub struct SkiaContext {
    pixmap: Pixmap,
    font_system: FontSystem,
    swash_cache: SwashCache,
    /// Cache of shaped text to avoid re-shaping every frame
    text_cache: HashMap<TextCacheKey, CachedText>,
    /// Counter for LRU tracking
    cache_access_counter: u64,
    next_font_id: u32,
    shape_anti_alias: bool,
    text_anti_alias: bool,
}

impl SkiaContext {
    /// Create a context for a `width` x `height` surface using the system fonts
    pub fn new(width: u32, height: u32, settings: &RenderSettings) -> Result<Self, SurfaceInitError> {
        let locale = sys_locale::get_locale().unwrap_or_else(|| "en-US".to_string());
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(fonts = db.len(), %locale, "Loaded system fonts");
        Self::with_font_db(width, height, settings, locale, db)
    }

    /// Create a context with an explicit font database
    pub fn with_font_db(
        width: u32,
        height: u32,
        settings: &RenderSettings,
        locale: String,
        db: fontdb::Database,
    ) -> Result<Self, SurfaceInitError> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            SurfaceInitError::Context(format!("cannot allocate a {width}x{height} pixmap"))
        })?;

        Ok(Self {
            pixmap,
            font_system: FontSystem::new_with_locale_and_db(locale, db),
            swash_cache: SwashCache::new(),
            text_cache: HashMap::with_capacity(64),
            cache_access_counter: 0,
            next_font_id: 0,
            shape_anti_alias: settings.shape_anti_alias,
            text_anti_alias: settings.text_anti_alias,
        })
    }

    /// Evict least recently used entries if cache is too large
    fn evict_lru_if_needed(&mut self) {
        if self.text_cache.len() <= TEXT_CACHE_MAX_ENTRIES {
            return;
        }

        // Remove the oldest quarter
        let target_size = TEXT_CACHE_MAX_ENTRIES * 3 / 4;
        let mut entries: Vec<_> = self
            .text_cache
            .iter()
            .map(|(k, v)| (k.clone(), v.last_used))
            .collect();
        entries.sort_by_key(|(_, last_used)| *last_used);

        for (key, _) in entries
            .into_iter()
            .take(self.text_cache.len() - target_size)
        {
            self.text_cache.remove(&key);
        }
    }

    /// Ensure `text` is shaped for `font`. Returns (width, height).
    fn ensure_shaped(&mut self, text: &str, font: &SkiaFont) -> (f32, f32) {
        self.cache_access_counter += 1;
        let current_access = self.cache_access_counter;

        // Linear search avoids allocating a key on hit; a HUD has few distinct strings
        if let Some((_, cached)) = self
            .text_cache
            .iter_mut()
            .find(|(k, _)| k.1 == font.id && k.0 == text)
        {
            cached.last_used = current_access;
            return (cached.width, cached.height);
        }

        let mut text_buffer = Buffer::new(&mut self.font_system, font.metrics);
        if font.word_wrap {
            let wrap_width = self.pixmap.width() as f32;
            text_buffer.set_size(&mut self.font_system, Some(wrap_width), None);
        }

        let attrs = Attrs::new()
            .family(Family::Name(&font.family))
            .weight(font.weight)
            .style(font.style);
        text_buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        text_buffer.shape_until_scroll(&mut self.font_system, false);

        let mut glyphs = Vec::new();
        let mut width = 0.0f32;
        let mut height = 0.0f32;

        for run in text_buffer.layout_runs() {
            width = width.max(run.line_w);
            height += run.line_height;

            for glyph in run.glyphs.iter() {
                glyphs.push((glyph.clone(), run.line_y));
            }
        }

        self.text_cache.insert(
            (text.to_string(), font.id),
            CachedText {
                glyphs,
                width,
                height,
                last_used: current_access,
            },
        );
        self.evict_lru_if_needed();

        (width, height)
    }

    /// Name of the installed family that renders `requested`.
    ///
    /// A family that is not installed falls back to the generic sans-serif
    /// face, then to any installed face. `None` only for an empty database.
    fn resolve_family(&self, requested: &str, weight: Weight, style: Style) -> Option<String> {
        let db = self.font_system.db();
        if query_face(db, &[fontdb::Family::Name(requested)], weight, style).is_some() {
            return Some(requested.to_string());
        }

        let fallback = query_face(db, &[fontdb::Family::SansSerif], weight, style)
            .or_else(|| db.faces().next().map(|face| face.id))?;
        let name = db.face(fallback)?.families.first()?.0.clone();
        tracing::warn!(requested, fallback = %name, "Font family not installed, using fallback");
        Some(name)
    }

    fn paint_glyphs(&mut self, font: &SkiaFont, brush: &SkiaBrush, x: f32, y: f32, text: &str) {
        let Some(cached) = self
            .text_cache
            .iter()
            .find(|(k, _)| k.1 == font.id && k.0 == text)
            .map(|(_, v)| v)
        else {
            return;
        };

        for (glyph, line_y) in &cached.glyphs {
            let physical_glyph = glyph.physical((x, y + line_y), 1.0);

            let Some(image) = self
                .swash_cache
                .get_image(&mut self.font_system, physical_glyph.cache_key)
            else {
                continue;
            };
            // Color (emoji) bitmaps are not supported
            if image.content != SwashContent::Mask {
                continue;
            }

            draw_glyph_to_pixmap(
                &mut self.pixmap,
                &image.data,
                image.placement.width,
                image.placement.height,
                physical_glyph.x + image.placement.left,
                physical_glyph.y - image.placement.top,
                brush.text_color,
                self.text_anti_alias,
            );
        }
    }

    fn stroke_path(&mut self, path: &Path, brush: &SkiaBrush, width: f32) {
        let stroke = Stroke {
            width,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(path, &brush.paint, &stroke, Transform::identity(), None);
    }

    fn fill_path(&mut self, path: &Path, brush: &SkiaBrush) {
        self.pixmap.fill_path(
            path,
            &brush.paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn fill_dot(&mut self, brush: &SkiaBrush, x: f32, y: f32, radius: f32) {
        if let Some(path) = PathBuilder::from_circle(x, y, radius) {
            self.fill_path(&path, brush);
        }
    }

    fn stroke_segments(&mut self, brush: &SkiaBrush, segments: &[[f32; 4]], width: f32) {
        let mut pb = PathBuilder::new();
        for [x0, y0, x1, y1] in segments {
            pb.move_to(*x0, *y0);
            pb.line_to(*x1, *y1);
        }
        if let Some(path) = pb.finish() {
            self.stroke_path(&path, brush, width);
        }
    }
}

impl DrawingContext for SkiaContext {
    type Brush = SkiaBrush;
    type Font = SkiaFont;

    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        self.pixmap = Pixmap::new(width, height).ok_or_else(|| {
            ResourceError::Backend(format!("cannot allocate a {width}x{height} pixmap"))
        })?;
        // Wrapped layouts depend on the surface width
        self.text_cache.clear();
        Ok(())
    }

    fn create_brush(&mut self, color: Color) -> Result<SkiaBrush, ResourceError> {
        let mut paint = Paint::default();
        paint.set_color(skia_color(color));
        paint.anti_alias = self.shape_anti_alias;

        let [r, g, b, a] = color;
        Ok(SkiaBrush {
            paint,
            text_color: CosmicColor::rgba(r, g, b, a),
        })
    }

    fn create_font(&mut self, desc: &FontDesc<'_>) -> Result<SkiaFont, ResourceError> {
        if !(desc.size.is_finite() && desc.size > 0.0) {
            return Err(ResourceError::InvalidFontSize { size: desc.size });
        }

        let weight = if desc.bold { Weight::BOLD } else { Weight::NORMAL };
        let style = if desc.italic { Style::Italic } else { Style::Normal };
        let family = self.resolve_family(desc.family, weight, style).ok_or_else(|| {
            ResourceError::FontNotFound {
                family: desc.family.to_string(),
            }
        })?;

        self.next_font_id = self.next_font_id.wrapping_add(1);
        Ok(SkiaFont {
            id: self.next_font_id,
            family,
            weight,
            style,
            metrics: Metrics::new(desc.size, desc.size * LINE_HEIGHT_FACTOR),
            word_wrap: desc.word_wrap,
        })
    }

    fn release(&mut self, resource: Resource<SkiaBrush, SkiaFont>) {
        if let Resource::Font(font) = resource {
            self.text_cache.retain(|(_, id), _| *id != font.id);
        }
    }

    fn clear_scene(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    fn begin_scene(&mut self) {}

    fn end_scene(&mut self) {}

    fn frame_pixels(&self) -> &[u8] {
        self.pixmap.data()
    }

    fn draw_line(
        &mut self,
        brush: &SkiaBrush,
        from_x: f32,
        from_y: f32,
        to_x: f32,
        to_y: f32,
        stroke: f32,
    ) {
        self.stroke_segments(brush, &[[from_x, from_y, to_x, to_y]], stroke);
    }

    fn draw_rect(
        &mut self,
        brush: &SkiaBrush,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        stroke: f32,
    ) {
        let Some(rect) = Rect::from_ltrb(left, top, right, bottom) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        self.stroke_path(&path, brush, stroke);
    }

    fn fill_rect(&mut self, brush: &SkiaBrush, left: f32, top: f32, right: f32, bottom: f32) {
        let Some(rect) = Rect::from_ltrb(left, top, right, bottom) else {
            return;
        };
        self.pixmap
            .fill_rect(rect, &brush.paint, Transform::identity(), None);
    }

    fn draw_rect_edges(
        &mut self,
        brush: &SkiaBrush,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        stroke: f32,
    ) {
        let dx = (right - left) * RECT_EDGE_FRACTION;
        let dy = (bottom - top) * RECT_EDGE_FRACTION;
        self.stroke_segments(
            brush,
            &[
                [left, top, left + dx, top],
                [left, top, left, top + dy],
                [right, top, right - dx, top],
                [right, top, right, top + dy],
                [left, bottom, left + dx, bottom],
                [left, bottom, left, bottom - dy],
                [right, bottom, right - dx, bottom],
                [right, bottom, right, bottom - dy],
            ],
            stroke,
        );
    }

    fn draw_rounded_rect(
        &mut self,
        brush: &SkiaBrush,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        radius: f32,
        stroke: f32,
    ) {
        let Some(path) = create_rounded_rect_path(left, top, right - left, bottom - top, radius)
        else {
            return;
        };
        self.stroke_path(&path, brush, stroke);
    }

    fn draw_circle(&mut self, brush: &SkiaBrush, x: f32, y: f32, radius: f32, stroke: f32) {
        if let Some(path) = PathBuilder::from_circle(x, y, radius) {
            self.stroke_path(&path, brush, stroke);
        }
    }

    fn draw_crosshair(
        &mut self,
        brush: &SkiaBrush,
        style: CrosshairStyle,
        x: f32,
        y: f32,
        size: f32,
        stroke: f32,
    ) {
        let plus = [[x - size, y, x + size, y], [x, y - size, x, y + size]];
        match style {
            CrosshairStyle::Dot => self.fill_dot(brush, x, y, size),
            CrosshairStyle::Plus => self.stroke_segments(brush, &plus, stroke),
            CrosshairStyle::Cross => {
                self.stroke_segments(brush, &plus, stroke);
                self.fill_dot(brush, x, y, stroke.max(1.0));
            }
            CrosshairStyle::Gap => {
                let gap = size / 2.0;
                self.stroke_segments(
                    brush,
                    &[
                        [x - size, y, x - gap, y],
                        [x + gap, y, x + size, y],
                        [x, y - size, x, y - gap],
                        [x, y + gap, x, y + size],
                    ],
                    stroke,
                );
            }
            CrosshairStyle::Diagonal => self.stroke_segments(
                brush,
                &[
                    [x - size, y - size, x + size, y + size],
                    [x + size, y - size, x - size, y + size],
                ],
                stroke,
            ),
        }
    }

    fn draw_text(&mut self, font: &SkiaFont, brush: &SkiaBrush, x: f32, y: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        self.ensure_shaped(text, font);
        self.paint_glyphs(font, brush, x, y, text);
    }

    fn draw_text_with_background(
        &mut self,
        font: &SkiaFont,
        brush: &SkiaBrush,
        background: &SkiaBrush,
        x: f32,
        y: f32,
        text: &str,
    ) {
        if text.is_empty() {
            return;
        }
        let (width, height) = self.ensure_shaped(text, font);
        self.fill_rect(background, x, y, x + width, y + height);
        self.paint_glyphs(font, brush, x, y, text);
    }
}

fn query_face(
    db: &fontdb::Database,
    families: &[fontdb::Family<'_>],
    weight: Weight,
    style: Style,
) -> Option<fontdb::ID> {
    db.query(&fontdb::Query {
        families,
        weight,
        stretch: fontdb::Stretch::Normal,
        style,
    })
}

/// Create a rounded rectangle path
fn create_rounded_rect_path(x: f32, y: f32, w: f32, h: f32, r: f32) -> Option<Path> {
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);

    let mut pb = PathBuilder::new();

    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);

    pb.close();
    pb.finish()
}

/// Blend a glyph coverage mask onto the pixmap (premultiplied source-over)
fn draw_glyph_to_pixmap(
    pixmap: &mut Pixmap,
    glyph_data: &[u8],
    glyph_width: u32,
    glyph_height: u32,
    dest_x: i32,
    dest_y: i32,
    color: CosmicColor,
    anti_alias: bool,
) {
    let pixmap_width = pixmap.width() as i32;
    let pixmap_height = pixmap.height() as i32;
    let data = pixmap.data_mut();

    for gy in 0..glyph_height as i32 {
        let py = dest_y + gy;
        if py < 0 || py >= pixmap_height {
            continue;
        }

        for gx in 0..glyph_width as i32 {
            let px = dest_x + gx;
            if px < 0 || px >= pixmap_width {
                continue;
            }

            let glyph_idx = (gy as u32 * glyph_width + gx as u32) as usize;
            let Some(&coverage) = glyph_data.get(glyph_idx) else {
                continue;
            };
            let coverage = match (anti_alias, coverage) {
                (_, 0) => continue,
                (true, c) => c,
                (false, c) if c >= ALIASED_COVERAGE_THRESHOLD => 255,
                (false, _) => continue,
            };

            let pixel_idx = ((py as u32 * pixmap_width as u32 + px as u32) * 4) as usize;
            if pixel_idx + 3 >= data.len() {
                continue;
            }

            let src_a = (coverage as u32 * color.a() as u32) / 255;
            let inv_a = 255 - src_a;

            data[pixel_idx] =
                ((color.r() as u32 * src_a + data[pixel_idx] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 1] =
                ((color.g() as u32 * src_a + data[pixel_idx + 1] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 2] =
                ((color.b() as u32 * src_a + data[pixel_idx + 2] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 3] = (src_a + (data[pixel_idx + 3] as u32 * inv_a) / 255) as u8;
        }
    }
}
