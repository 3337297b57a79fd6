use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Environment variable that overrides `log.level`.
pub const LOG_ENV: &str = "PAYDASH_LOG";

/// Install the global subscriber writing to a daily rolling file.
///
/// Stdout carries command results and stderr carries notifications, so
/// diagnostics only go to the file. Keep the returned guard alive until
/// exit or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let directory = log_directory(config)?;
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::daily(&directory, "paydash.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(filter(config))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok(guard)
}

fn filter(config: &LogConfig) -> EnvFilter {
  let directive = std::env::var(LOG_ENV).unwrap_or_else(|_| config.level.clone());
  EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn log_directory(config: &LogConfig) -> Result<PathBuf> {
  match &config.directory {
    Some(dir) => Ok(dir.clone()),
    None => dirs::data_dir()
      .map(|dir| dir.join("paydash").join("logs"))
      .ok_or_else(|| eyre!("Could not determine data directory for logs")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_explicit_directory_wins() {
    let config = LogConfig {
      level: "debug".into(),
      directory: Some(PathBuf::from("/var/log/paydash")),
    };
    assert_eq!(log_directory(&config).unwrap(), PathBuf::from("/var/log/paydash"));
  }

  #[test]
  fn test_bad_level_falls_back() {
    let config = LogConfig {
      level: "paydash=[".into(),
      directory: None,
    };
    // Must not panic on an unparseable directive.
    let _ = filter(&config);
  }
}
