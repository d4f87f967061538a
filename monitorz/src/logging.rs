//! File logging. The TUI owns the terminal, so tracing output goes to a
//! daily-rolled file under the cache dir instead of stderr.

use std::path::PathBuf;

use anyhow::Result;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "MONITORZ_LOG";
pub const LOG_DIR_ENV: &str = "MONITORZ_LOG_DIR";
const LOG_FILE: &str = "monitorz.log";

pub fn log_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs_next::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("monitorz")
        .join("logs")
}

pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber and return the log directory. Keep the guard
/// alive until exit or buffered lines are lost.
pub fn init(verbosity: u8) -> Result<(WorkerGuard, PathBuf)> {
    // MONITORZ_LOG (EnvFilter syntax) overrides -v
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level_for(verbosity).into()));

    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;

    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    Ok((guard, dir))
}
