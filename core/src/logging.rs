//! Tracing setup for binaries. The library itself only emits events.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILE_NAME: &str = "siem_tasks.log";

/// Installs stderr plus a daily-rotated file under `log_dir`.
///
/// Keep the returned guard alive for the life of the process or buffered
/// file output is lost on exit.
pub fn init_logging(log_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (tests, embedding) keeps the first subscriber.
    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        tracing::debug!(error = %e, "global subscriber already set, new layers not installed");
    }

    tracing::debug!(log_dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}
