//! Health / armor / ammo readout
//!
//! Health is anchored to the bottom-left corner, armor sits at a fixed
//! position and the ammo pair ("clip / reserve") is anchored to the
//! bottom-right corner. Every readout is outlined bold text.

use std::fmt::Write as _;

use gsi_hud_types::HudLayout;

use super::FrameHandler;
use crate::context::DrawingContext;
use crate::frame::{Frame, TextStyle};
use crate::telemetry::TelemetryReader;

const AMMO_SEPARATOR: &str = "/";

pub struct HudOverlay {
    telemetry: TelemetryReader,
    layout: HudLayout,
    // Reused every frame so formatting the readouts does not allocate
    health_text: String,
    armor_text: String,
    clip_text: String,
    reserve_text: String,
}

impl HudOverlay {
    pub fn new(telemetry: TelemetryReader, layout: HudLayout) -> Self {
        Self {
            telemetry,
            layout,
            health_text: String::with_capacity(8),
            armor_text: String::with_capacity(8),
            clip_text: String::with_capacity(8),
            reserve_text: String::with_capacity(8),
        }
    }

    fn refresh_text(&mut self) {
        let snapshot = *self.telemetry.latest();
        set_number(&mut self.health_text, snapshot.health);
        set_number(&mut self.armor_text, snapshot.armor);
        set_number(&mut self.clip_text, snapshot.ammo_clip);
        set_number(&mut self.reserve_text, snapshot.ammo_reserve);
    }
}

fn set_number(buf: &mut String, value: i32) {
    buf.clear();
    // Writing into a String cannot fail
    let _ = write!(buf, "{}", value);
}

impl<C: DrawingContext> FrameHandler<C> for HudOverlay {
    fn draw(&mut self, frame: &mut Frame<'_, C>) {
        self.refresh_text();

        let layout = &self.layout;
        let size = layout.font_size;
        let inset = layout.margin + size;
        let outline = layout.outline_color;
        let baseline_y = frame.height() - inset;

        frame.draw_text_with_outline(
            &self.health_text,
            inset,
            baseline_y,
            size,
            layout.health_color,
            outline,
            TextStyle::BOLD,
        );

        frame.draw_text_with_outline(
            &self.armor_text,
            layout.armor_x,
            layout.armor_y,
            size,
            layout.armor_color,
            outline,
            TextStyle::BOLD,
        );

        // Clip, separator and reserve each start where the previous estimate ends
        let mut x = frame.width() - (layout.ammo_inset + size);
        for text in [
            self.clip_text.as_str(),
            AMMO_SEPARATOR,
            self.reserve_text.as_str(),
        ] {
            frame.draw_text_with_outline(
                text,
                x,
                baseline_y,
                size,
                layout.ammo_color,
                outline,
                TextStyle::BOLD,
            );
            x += layout.estimate_width(text) + layout.ammo_gap;
        }
    }
}
