//! Logging setup: daily-rolling file under the XDG state directory
//!
//! Log output goes to `~/.local/state/tidemark/tidemark.log.YYYY-MM-DD`,
//! keeping stdout clean for CLI output. The appender rotates daily and
//! prunes old files down to `logging.max_files`; the level comes from
//! `RUST_LOG` when set, otherwise from `logging.level` in the config.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

/// Keeps the non-blocking log writer alive.
///
/// Dropping the guard flushes pending writes, so the caller holds it
/// for the life of the process.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Install the global subscriber writing to the rolling log file.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let (writer, guard) = tracing_appender::non_blocking(file_appender(&log_dir, config)?);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Daily-rolling appender that keeps at most `max_files` rotated files.
fn file_appender(log_dir: &Path, config: &LoggingConfig) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("tidemark.log")
        .max_log_files(config.max_files.max(1))
        .build(log_dir)
        .map_err(|e| Error::Config(format!("failed to create log appender: {}", e)))
}

/// Test logging: stdout via the test writer, `RUST_LOG`-controlled.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Path of the current log file.
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}
