//! Process-wide tracing setup.
//!
//! On Linux the subscriber writes to the systemd journal under the
//! `shutter` identifier. Anywhere the journal socket cannot be reached, lines
//! go to `shutter.log` in a directory that rotates daily.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SHUTTER_LOG";

const DEFAULT_FILTER: &str = "info";

/// Where log records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Journald,
    File(PathBuf),
}

/// Install the global subscriber and report which backend it uses.
///
/// `SHUTTER_LOG` takes any `EnvFilter` directive, such as `debug` or
/// `shutter::live=trace`. Fails if a subscriber is already installed.
pub fn init(log_dir: Option<PathBuf>) -> Result<Backend> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(journald) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(filter())
                .with(journald.with_syslog_identifier("shutter".to_string()))
                .try_init()
                .context("A tracing subscriber is already installed")?;
            tracing::info!("Writing logs to the journal");
            return Ok(Backend::Journald);
        }
    }

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    init_file(&log_dir)?;
    tracing::info!(dir = %log_dir.display(), "Writing logs to file");
    Ok(Backend::File(log_dir))
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn init_file(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "shutter.log"));

    // The worker flushes until the guard drops, so it lives for the process.
    static FLUSH_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
    let _ = FLUSH_GUARD.set(guard);

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("A tracing subscriber is already installed")
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shutter")
        .join("logs")
}
