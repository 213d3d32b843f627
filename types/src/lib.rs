//! Shared configuration and telemetry types for the GSI HUD
//!
//! This crate contains the serializable configuration consumed by the overlay
//! and the plain value types that describe the player's state as pushed by the
//! game. It has no threading or rendering concerns of its own.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Colors
// ─────────────────────────────────────────────────────────────────────────────

/// RGBA color, one byte per channel
pub type Color = [u8; 4];

/// Default colors used by the HUD
pub mod overlay_colors {
    use super::Color;

    pub const WHITE: Color = [255, 255, 255, 255];
    pub const BLACK: Color = [0, 0, 0, 255];
    pub const BLUE: Color = [0, 0, 255, 255];
}

// ─────────────────────────────────────────────────────────────────────────────
// Telemetry
// ─────────────────────────────────────────────────────────────────────────────

/// Latest known values of the local player's state.
///
/// Fields are independent; nothing couples e.g. `ammo_clip` to `ammo_reserve`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub money: i32,
    pub health: i32,
    pub armor: i32,
    pub has_helmet: bool,
    pub round_kills: i32,
    pub ammo_clip: i32,
    pub ammo_reserve: i32,
}

/// One game-state push for the local player.
///
/// Every field is optional: the game omits whole sections between rounds and
/// there is no active weapon while dead or spectating. An absent field means
/// "unchanged", never "zero".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_helmet: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_kills: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_weapon: Option<WeaponAmmo>,
}

/// Ammunition of the currently held weapon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponAmmo {
    pub clip: i32,
    pub reserve: i32,
}

impl TelemetrySnapshot {
    /// Return a copy of this snapshot with every present field of `update` applied
    pub fn merged(&self, update: &PlayerUpdate) -> Self {
        let mut next = *self;
        if let Some(money) = update.money {
            next.money = money;
        }
        if let Some(health) = update.health {
            next.health = health;
        }
        if let Some(armor) = update.armor {
            next.armor = armor;
        }
        if let Some(has_helmet) = update.has_helmet {
            next.has_helmet = has_helmet;
        }
        if let Some(round_kills) = update.round_kills {
            next.round_kills = round_kills;
        }
        if let Some(weapon) = update.active_weapon {
            next.ammo_clip = weapon.clip;
            next.ammo_reserve = weapon.reserve;
        }
        next
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde Default Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}
fn default_fps() -> u32 {
    10
}
fn default_namespace() -> String {
    "gsi-hud".to_string()
}
fn default_font_family() -> String {
    "Noto Sans".to_string()
}
fn default_font_size() -> f32 {
    48.0
}
fn default_margin() -> f32 {
    12.0
}
fn default_armor_x() -> f32 {
    164.0
}
fn default_armor_y() -> f32 {
    1020.0
}
fn default_ammo_inset() -> f32 {
    164.0
}
fn default_ammo_gap() -> f32 {
    4.0
}
fn default_glyph_width_factor() -> f32 {
    0.6
}
fn default_white() -> Color {
    overlay_colors::WHITE
}
fn default_black() -> Color {
    overlay_colors::BLACK
}
fn default_blue() -> Color {
    overlay_colors::BLUE
}

// ─────────────────────────────────────────────────────────────────────────────
// Surface
// ─────────────────────────────────────────────────────────────────────────────

/// Placement and pacing of the overlay surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSettings {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Target frame rate of the frame pump
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Window class / layer namespace, used by window-manager rules
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_true")]
    pub click_through: bool,
    /// Log the achieved frame rate once per second
    #[serde(default)]
    pub measure_fps: bool,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            namespace: default_namespace(),
            click_through: true,
            measure_fps: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Drawing-context options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Family used for plain and outlined text
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Family used for text drawn over a background box
    #[serde(default = "default_font_family")]
    pub background_font_family: String,
    /// Anti-alias lines, boxes and circles
    #[serde(default)]
    pub shape_anti_alias: bool,
    #[serde(default = "default_true")]
    pub text_anti_alias: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            background_font_family: default_font_family(),
            shape_anti_alias: false,
            text_anti_alias: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HUD Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Where and how each readout is drawn.
///
/// Health is anchored to the bottom-left corner, armor sits at an absolute
/// position and the ammo pair is anchored to the bottom-right corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudLayout {
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Distance kept from the surface edges, in addition to one font size
    #[serde(default = "default_margin")]
    pub margin: f32,
    #[serde(default = "default_armor_x")]
    pub armor_x: f32,
    #[serde(default = "default_armor_y")]
    pub armor_y: f32,
    /// Horizontal distance of the clip readout from the right edge, in
    /// addition to one font size
    #[serde(default = "default_ammo_inset")]
    pub ammo_inset: f32,
    /// Space between clip, separator and reserve
    #[serde(default = "default_ammo_gap")]
    pub ammo_gap: f32,
    /// Estimated glyph advance as a fraction of the font size
    #[serde(default = "default_glyph_width_factor")]
    pub glyph_width_factor: f32,
    #[serde(default = "default_white")]
    pub health_color: Color,
    #[serde(default = "default_blue")]
    pub armor_color: Color,
    #[serde(default = "default_white")]
    pub ammo_color: Color,
    #[serde(default = "default_black")]
    pub outline_color: Color,
}

impl Default for HudLayout {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            margin: default_margin(),
            armor_x: default_armor_x(),
            armor_y: default_armor_y(),
            ammo_inset: default_ammo_inset(),
            ammo_gap: default_ammo_gap(),
            glyph_width_factor: default_glyph_width_factor(),
            health_color: overlay_colors::WHITE,
            armor_color: overlay_colors::BLUE,
            ammo_color: overlay_colors::WHITE,
            outline_color: overlay_colors::BLACK,
        }
    }
}

impl HudLayout {
    /// Estimated rendered width of `text` at the layout's font size
    pub fn estimate_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.glyph_width_factor * self.font_size
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// App Config
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HudConfig {
    #[serde(default)]
    pub surface: SurfaceSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub layout: HudLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_applies_present_fields_only() {
        let base = TelemetrySnapshot {
            money: 800,
            health: 100,
            armor: 0,
            has_helmet: false,
            round_kills: 0,
            ammo_clip: 12,
            ammo_reserve: 24,
        };
        let update = PlayerUpdate {
            health: Some(73),
            armor: Some(100),
            has_helmet: Some(true),
            ..Default::default()
        };

        let next = base.merged(&update);
        assert_eq!(next.health, 73);
        assert_eq!(next.armor, 100);
        assert!(next.has_helmet);
        assert_eq!(next.money, 800);
        assert_eq!(next.ammo_clip, 12);
        assert_eq!(next.ammo_reserve, 24);
    }

    #[test]
    fn missing_weapon_keeps_last_ammo() {
        let base = TelemetrySnapshot {
            ammo_clip: 30,
            ammo_reserve: 90,
            ..Default::default()
        };
        let dead = PlayerUpdate {
            health: Some(0),
            active_weapon: None,
            ..Default::default()
        };
        let next = base.merged(&dead);
        assert_eq!(next.health, 0);
        assert_eq!((next.ammo_clip, next.ammo_reserve), (30, 90));

        let rearmed = PlayerUpdate {
            active_weapon: Some(WeaponAmmo { clip: 7, reserve: 35 }),
            ..Default::default()
        };
        let next = next.merged(&rearmed);
        assert_eq!((next.ammo_clip, next.ammo_reserve), (7, 35));
    }

    #[test]
    fn width_estimate_scales_with_chars() {
        let layout = HudLayout::default();
        let one = layout.estimate_width("/");
        assert!((one - 28.8).abs() < 1e-4);
        assert!((layout.estimate_width("100") - 3.0 * one).abs() < 1e-4);
        assert_eq!(layout.estimate_width(""), 0.0);
    }

    #[test]
    fn defaults_match_reference_layout() {
        let config = HudConfig::default();
        assert_eq!((config.surface.width, config.surface.height), (1920, 1080));
        assert_eq!(config.surface.fps, 10);
        assert!(config.surface.click_through);
        assert!(!config.render.shape_anti_alias);
        assert!(config.render.text_anti_alias);
        assert_eq!(config.layout.armor_color, overlay_colors::BLUE);
    }
}
