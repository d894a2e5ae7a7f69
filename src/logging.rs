// =============================================================================
// Logging — daily rolling file, filtered by RUST_LOG
// =============================================================================
//
// The terminal belongs to the dashboard, so nothing is written to stdout.
// Keep the returned guard alive for the life of the process or buffered
// lines are lost on exit.

use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_PREFIX: &str = "stockscope.log";

pub fn init(log_dir: impl AsRef<Path>) -> Result<WorkerGuard> {
    let file = RollingFileAppender::new(Rotation::DAILY, log_dir.as_ref(), LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}
