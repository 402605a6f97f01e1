//! Logging setup for the CLI

use biofile_finder::{config::LoggingConfig, dirs::default_log_dir};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "bff.log";

/// Parse log level from config string
fn parse_log_level(level: &str) -> LevelFilter {
  match level.to_lowercase().as_str() {
    "off" => LevelFilter::OFF,
    "error" => LevelFilter::ERROR,
    "warn" => LevelFilter::WARN,
    "info" => LevelFilter::INFO,
    "debug" => LevelFilter::DEBUG,
    "trace" => LevelFilter::TRACE,
    _ => LevelFilter::WARN,
  }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
  EnvFilter::builder()
    .with_default_directive(parse_log_level(&config.level).into())
    .from_env_lossy()
}

fn init_console_logging(config: &LoggingConfig) {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter(config))
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

/// Initialize logging from config. `RUST_LOG` overrides the configured level.
///
/// Logs go to stderr so command output stays clean; with `log_to_file` they go to a
/// rolling file instead. Returns the guard that must be kept alive for the duration of the program.
pub fn init_cli_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
  if !config.log_to_file {
    init_console_logging(config);
    return None;
  }

  let log_dir = default_log_dir();
  if std::fs::create_dir_all(&log_dir).is_err() {
    init_console_logging(config);
    return None;
  }

  let file_appender = match config.rotation.as_str() {
    "hourly" => tracing_appender::rolling::hourly(&log_dir, LOG_FILE),
    "never" => tracing_appender::rolling::never(&log_dir, LOG_FILE),
    _ => tracing_appender::rolling::daily(&log_dir, LOG_FILE),
  };
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter(config))
    .with_target(true)
    .with_ansi(false)
    .with_writer(file_writer)
    .init();

  Some(guard)
}
