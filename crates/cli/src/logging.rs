//! Logging utilities for CLI commands and daemon

use releasechan_core::DaemonConfig;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Get the data directory that holds daemon logs (respects env vars)
pub fn data_dir() -> PathBuf {
  releasechan::dirs::default_data_dir()
}

/// Initialize logging for CLI commands (console only, stderr so output stays pipeable)
pub fn init_cli_logging() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::builder().with_default_directive(tracing::Level::WARN.into()).from_env_lossy())
    .with_writer(std::io::stderr)
    .init();
}

/// Parse log level from config string
fn parse_log_level(level: &str) -> tracing::Level {
  match level.to_lowercase().as_str() {
    "off" | "error" => tracing::Level::ERROR,
    "warn" => tracing::Level::WARN,
    "info" => tracing::Level::INFO,
    "debug" => tracing::Level::DEBUG,
    "trace" => tracing::Level::TRACE,
    _ => tracing::Level::INFO,
  }
}

/// Initialize logging for the daemon with config-driven settings.
///
/// In foreground mode: Logs to console only with colors
/// In background mode: Logs to file only (no ANSI)
///
/// Returns the guard that must be kept alive for the duration of the program
pub fn init_daemon_logging(daemon_config: &DaemonConfig, foreground: bool) -> Option<WorkerGuard> {
  let level = parse_log_level(&daemon_config.log_level);

  // Build env filter (allows RUST_LOG override)
  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  if foreground {
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_ansi(true)
      .init();
    return None;
  }

  let log_dir = data_dir();
  if std::fs::create_dir_all(&log_dir).is_err() {
    // Fall back to console-only logging
    init_cli_logging();
    return None;
  }

  let file_name = releasechan::dirs::log_file_name();
  let file_appender = match daemon_config.log_rotation.as_str() {
    "hourly" => tracing_appender::rolling::hourly(&log_dir, file_name),
    "never" => tracing_appender::rolling::never(&log_dir, file_name),
    _ => tracing_appender::rolling::daily(&log_dir, file_name),
  };

  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(true)
    .with_ansi(false)
    .with_writer(file_writer)
    .init();

  Some(guard)
}
