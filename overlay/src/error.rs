use thiserror::Error;

use crate::platform::PlatformError;

/// Failure to create a drawing resource.
///
/// Never fatal: the resource cache does not remember failures, so the same
/// request is retried on the next frame.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("invalid font size {size}")]
    InvalidFontSize { size: f32 },

    #[error("font family '{family}' is not installed")]
    FontNotFound { family: String },

    #[error("drawing backend rejected resource: {0}")]
    Backend(String),
}

/// Failure to bring up the overlay surface or its drawing context
#[derive(Debug, Error)]
pub enum SurfaceInitError {
    #[error("failed to create overlay window")]
    Platform(#[from] PlatformError),

    #[error("failed to create drawing context: {0}")]
    Context(String),

    #[error("failed to spawn overlay thread")]
    Spawn(#[source] std::io::Error),
}
