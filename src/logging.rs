//! Tracing setup: stderr plus the activity and application log files.
//!
//! Activity lines (one per completed file operation) are emitted on
//! [`ACTIVITY_TARGET`] and go to `Photo_Organizer_Activities.log`. Everything
//! else goes to `Photo_Organizer_Application.log`. Both files live in the
//! destination root and are never rotated by this crate.

use crate::error::StartupError;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Target of per-file activity events
pub const ACTIVITY_TARGET: &str = "photo_organizer::activity";

pub const ACTIVITY_LOG_FILE: &str = "Photo_Organizer_Activities.log";
pub const APPLICATION_LOG_FILE: &str = "Photo_Organizer_Application.log";

/// Keeps the background log writers alive; drop to flush them
pub struct LogGuards {
    _activity: WorkerGuard,
    _application: WorkerGuard,
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn file_writer(
    dir: &Path,
    name: &str,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), StartupError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| StartupError::Logging(format!("{}: {}", dir.join(name).display(), e)))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Log to stderr only (for one-shot commands)
pub fn init_tracing(verbose: bool) -> Result<(), StartupError> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter(verbose))
        .try_init()
        .map_err(|e| StartupError::Logging(e.to_string()))
}

/// Log to stderr and to the two log files in `log_dir`
pub fn init_logging(log_dir: &Path, verbose: bool) -> Result<LogGuards, StartupError> {
    let (activity_writer, activity_guard) = file_writer(log_dir, ACTIVITY_LOG_FILE)?;
    let (application_writer, application_guard) = file_writer(log_dir, APPLICATION_LOG_FILE)?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(
            fmt::layer()
                .with_writer(activity_writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(filter_fn(|meta| meta.target() == ACTIVITY_TARGET)),
        )
        .with(
            fmt::layer()
                .with_writer(application_writer)
                .with_ansi(false)
                .with_filter(filter_fn(|meta| meta.target() != ACTIVITY_TARGET)),
        )
        .with(env_filter(verbose))
        .try_init()
        .map_err(|e| StartupError::Logging(e.to_string()))?;

    Ok(LogGuards {
        _activity: activity_guard,
        _application: application_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_writer_creates_log_in_directory() {
        let temp_dir = TempDir::new().unwrap();
        let (_writer, _guard) = file_writer(temp_dir.path(), ACTIVITY_LOG_FILE).unwrap();
        assert!(temp_dir.path().join(ACTIVITY_LOG_FILE).exists());
    }

    #[test]
    fn file_writer_fails_for_missing_directory_parent() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        let result = file_writer(&blocker.join("logs"), APPLICATION_LOG_FILE);
        assert!(matches!(result, Err(StartupError::Logging(_))));
    }
}
