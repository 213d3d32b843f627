//! Persistence of [`HudConfig`] and command-line overrides

use gsi_hud_types::HudConfig;
use thiserror::Error;

pub const APP_NAME: &str = "gsi-hud";
const CONFIG_NAME: &str = "config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),
}

/// Surface overrides taken from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
}

pub trait HudConfigExt: Sized {
    /// Read the stored config, propagating errors
    fn try_load() -> Result<Self, ConfigError>;

    /// Read the stored config, falling back to defaults on any error
    fn load() -> Self;

    fn save(&self) -> Result<(), ConfigError>;

    fn apply_overrides(&mut self, overrides: SurfaceOverrides);
}

impl HudConfigExt for HudConfig {
    fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "Using default configuration");
            Self::default()
        })
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)?;
        if let Ok(path) = confy::get_configuration_file_path(APP_NAME, CONFIG_NAME) {
            tracing::info!(path = ?path, "Configuration saved");
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: SurfaceOverrides) {
        let surface = &mut self.surface;
        if let Some(width) = overrides.width {
            surface.width = width;
        }
        if let Some(height) = overrides.height {
            surface.height = height;
        }
        if let Some(fps) = overrides.fps {
            surface.fps = fps.max(1);
        }
    }
}
