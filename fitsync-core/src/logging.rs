//! Logging for fitsync
//!
//! Every event goes to a daily-rotated file under `$XDG_STATE_HOME/fitsync/`.
//! Warnings are also echoed on stderr unless `logging.stderr = false`, so a
//! skipped day folder or an empty track file is visible at the terminal.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Install the global subscriber.
///
/// The file layer honors `RUST_LOG`, falling back to `config.level`.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_path = Config::log_path();
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(log_file_prefix(&log_path))
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| {
            Error::Config(format!(
                "cannot open log file in {}: {}",
                log_dir.display(),
                e
            ))
        })?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(file_filter);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .with_filter(stderr_filter(config));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!(
        log_file = %log_path.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Subscriber for unit tests; output is captured per test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Flushes the non-blocking file writer when dropped.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Returns the log file path
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

fn stderr_filter(config: &LoggingConfig) -> LevelFilter {
    if config.stderr {
        LevelFilter::WARN
    } else {
        LevelFilter::OFF
    }
}

// The appender appends the date to this prefix.
fn log_file_prefix(log_path: &std::path::Path) -> String {
    log_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("fitsync.log")
        .to_string()
}
