//! Structured logging setup.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global tracing subscriber
///
/// `RUST_LOG`, when set, overrides `level`. Output always goes to stdout; when
/// `log_file` is given it is also appended there (parent directories created).
///
/// Returns a configuration error for an unknown level or when a global subscriber
/// is already installed.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let default_level: LevelFilter = level.trim().parse().map_err(|_| {
        Error::config(
            format!("unknown log level {level:?} (expected error, warn, info, debug or trace)"),
            "BRC_LOG_LEVEL",
        )
    })?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config {
            message: format!("failed to install log subscriber: {e}"),
            key: None,
        })
}

/// [`init_logging`] with the configured level and log file
pub fn init_from_config(config: &Config) -> Result<()> {
    init_logging(&config.log_level, config.log_file.as_deref())
}
