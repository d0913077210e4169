//! Structured logging setup.
//!
//! [`init`] builds a [`Dispatch`] from [`LoggingConfig`]. The binary installs
//! it as the global default and hands it to the schedule, which binds it to
//! every probe run.

use serde::Deserialize;
use thiserror::Error;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

const LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

/// Errors that can occur while building the logger.
#[derive(Error, Debug)]
pub enum LoggingError {
  #[error("Unknown log level {0:?}, expected one of debug, info, warn, error")]
  UnknownLevel(String),
}

/// Logging section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
  /// One of `debug`, `info`, `warn`, `error`.
  #[serde(default = "default_level")]
  pub level: String,

  /// Emit `JSON` lines instead of human readable output.
  #[serde(default)]
  pub structured: bool,
}

fn default_level() -> String {
  String::from("info")
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_level(),
      structured: false,
    }
  }
}

impl LoggingConfig {
  pub fn validate(&self) -> Result<(), LoggingError> {
    if LEVELS.contains(&self.level.as_str()) {
      Ok(())
    } else {
      Err(LoggingError::UnknownLevel(self.level.clone()))
    }
  }
}

/// Build a logger writing to stdout.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<Dispatch, LoggingError> {
  config.validate()?;

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stdout)
    .with_target(true);

  let dispatch = if config.structured {
    Dispatch::new(builder.json().finish())
  } else {
    Dispatch::new(builder.finish())
  };

  Ok(dispatch)
}
