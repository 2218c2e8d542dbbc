//! Structured logging for voxscribe using the tracing crate.
//!
//! Writes to daily-rotated log files under the XDG state directory and never to
//! the terminal, so stdout stays clean for transcripts. Old log files beyond
//! the 7 most recent are removed at startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Base name of the log files (`voxscribe.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "voxscribe.log";

const MAX_LOG_FILES: usize = 7;

/// Keeps the non-blocking writer alive for the program lifetime.
static APPENDER_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes file-based logging.
///
/// Log level is controlled by `RUST_LOG` (defaults to "info").
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> Result<(), anyhow::Error> {
    let log_dir = get_log_dir()?;
    fs::create_dir_all(&log_dir)?;

    if let Err(e) = cleanup_old_logs(&log_dir) {
        eprintln!("Warning: Failed to cleanup old logs: {e}");
    }

    let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging initialized. Log directory: {}", log_dir.display());
    Ok(())
}

/// Log directory: `$XDG_STATE_HOME/voxscribe`, else `~/.local/state/voxscribe`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn get_log_dir() -> Result<PathBuf, anyhow::Error> {
    if let Some(xdg_state) = std::env::var_os("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg_state).join("voxscribe"));
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".local").join("state").join("voxscribe"))
}

/// Rotated log files in `log_dir`, newest first.
pub fn list_log_files(log_dir: &Path) -> Result<Vec<PathBuf>, anyhow::Error> {
    let mut files: Vec<(PathBuf, std::time::SystemTime)> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let name = path.file_name()?.to_string_lossy().to_string();
            if !name.starts_with(LOG_FILE_PREFIX) {
                return None;
            }
            let modified = fs::metadata(&path).ok()?.modified().ok()?;
            Some((path, modified))
        })
        .collect();

    files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    Ok(files.into_iter().map(|(path, _)| path).collect())
}

fn cleanup_old_logs(log_dir: &Path) -> Result<(), anyhow::Error> {
    for path in list_log_files(log_dir)?.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to delete old log file {}: {}", path.display(), e);
        }
    }
    Ok(())
}
