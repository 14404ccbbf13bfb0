//! Logging setup for the command-line tool.
//!
//! Console output plus a daily rolling file. The level defaults to `info`
//! and can be overridden with `RUST_LOG`.
//!
//! ```no_run
//! basic_cleaning::logging::init(None).expect("Failed to initialize logging");
//! tracing::info!("Downloading input artifact");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

const MAX_LOG_FILES: usize = 10;

/// Default log directory: `<platform data dir>/basic-cleaning/logs`.
///
/// # Errors
///
/// Returns an error if the platform has no data directory.
pub fn default_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("basic-cleaning").join("logs"))
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// Returns an error if the log directory or file appender cannot be
/// created.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let log_dir = match log_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_log_dir()?,
    };
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix("basic-cleaning")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create log file appender")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stdout_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::debug!("Logging initialized, log directory: {}", log_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir() {
        if let Ok(dir) = default_log_dir() {
            assert!(dir.ends_with("basic-cleaning/logs") || dir.ends_with("basic-cleaning\\logs"));
        }
    }
}
