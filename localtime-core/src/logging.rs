//! Logging for localtime
//!
//! A single file layer at `$XDG_STATE_HOME/localtime/localtime.log`, rotated
//! daily. Bind diagnostics arrive here as `warn` (unparseable timestamp) and
//! `error` (missing timestamp, unrecognized mode) events carrying the element
//! index, so the log reads as a history of every pass.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events are logged at the configured level; everything else
/// is held to `warn`.
const OWN_TARGETS: [&str; 2] = ["localtime_core", "localtime"];

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. An invalid configured level
/// is a configuration error.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_path = Config::log_path();
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_name = log_path
        .file_name()
        .ok_or_else(|| Error::Config(format!("invalid log path {}", log_path.display())))?;
    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    // Passes run on the main thread; thread ids and source locations add nothing
    let file_layer = fmt::layer()
        .compact()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::info!(
        log_path = %log_path.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Filter for `level` on our own crates, `warn` for dependencies.
fn level_filter(level: &str) -> Result<EnvFilter> {
    let directives = std::iter::once("warn".to_string())
        .chain(OWN_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",");

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("invalid log level {level:?}: {e}")))
}

/// Initialize logging for tests
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Flushes pending log lines when dropped.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}
