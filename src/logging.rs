//! Logging setup: stdout plus a size-rotated log file.
//!
//! The file lives at `<config dir>/gsi-hud/gsi-hud.log` and rotates at 5 MB,
//! keeping one previous file. `DEBUG_LOGGING=1` turns on debug output for the
//! HUD crates; `RUST_LOG` overrides both.

use std::path::PathBuf;

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_FILE_NAME: &str = "gsi-hud.log";
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

fn filter(debug_logging: bool) -> EnvFilter {
    let directive = if debug_logging {
        "info,gsi_hud=debug,gsi_hud_overlay=debug"
    } else {
        "info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

fn stdout_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
}

fn open_log_file() -> Result<(BasicRollingFileAppender, PathBuf), String> {
    let dir = dirs::config_dir()
        .ok_or("no config directory on this platform")?
        .join(crate::config::APP_NAME);
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("cannot create log directory {:?}: {}", dir, e))?;

    let path = dir.join(LOG_FILE_NAME);
    let appender =
        BasicRollingFileAppender::new(&path, RollingConditionBasic::new().max_size(MAX_LOG_SIZE), 1)
            .map_err(|e| format!("cannot open log file {:?}: {}", path, e))?;
    Ok((appender, path))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped and must be held
/// until shutdown. `None` means file logging was unavailable and only stdout
/// is used.
pub fn init() -> Option<WorkerGuard> {
    let debug_logging = std::env::var_os("DEBUG_LOGGING").is_some();
    let (appender, path) = match open_log_file() {
        Ok(file) => file,
        Err(reason) => {
            tracing_subscriber::registry()
                .with(stdout_layer())
                .with(filter(debug_logging))
                .init();
            tracing::warn!(%reason, "File logging unavailable, using stdout only");
            return None;
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer())
        .with(filter(debug_logging))
        .init();

    tracing::info!(log_file = ?path, debug_logging, "Logging initialized");
    Some(guard)
}
