// src/logging.rs

use crate::config::ServerConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_SUFFIX: &str = "log";

/// Daily rotating appender: `<dir>/<prefix>.<YYYY-MM-DD>.log`, at most `keep` files.
pub fn file_appender(cfg: &ServerConfig) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&cfg.log_prefix)
        .filename_suffix(LOG_SUFFIX)
        .max_log_files(cfg.log_keep)
        .build(&cfg.log_dir)
}

/// Installs the global subscriber: stdout plus the rotating file.
///
/// The returned guard flushes the file writer on drop, so keep it alive in `main`.
pub fn init(cfg: &ServerConfig) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&cfg.log_dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(cfg)?);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
