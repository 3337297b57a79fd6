use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{QueryKey, StalePolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub session: SessionConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL every request path is appended to, e.g. `https://api.example.com/v1`
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Transport-level retries of 5xx responses for replay-safe requests
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default = "default_retry_backoff_ms")]
  pub retry_backoff_ms: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_max_retries() -> u32 {
  2
}

fn default_retry_backoff_ms() -> u64 {
  250
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds until entries under a key family go stale, keyed by
  /// slash-separated prefix (`treasury/portfolio`)
  #[serde(default = "default_stale_after")]
  pub stale_after: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_after: default_stale_after(),
    }
  }
}

fn default_stale_after() -> BTreeMap<String, u64> {
  BTreeMap::from([
    ("treasury/portfolio".to_string(), 30),
    ("remittances/quote".to_string(), 15),
  ])
}

impl CacheConfig {
  pub fn stale_policy(&self) -> StalePolicy {
    self
      .stale_after
      .iter()
      .fold(StalePolicy::new(), |policy, (prefix, secs)| {
        let path: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        policy.with_rule(QueryKey::from_path(&path), Duration::from_secs(*secs))
      })
  }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
  /// Session survives restarts
  #[default]
  Sqlite,
  /// Session lives only as long as the process
  Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
  #[serde(default)]
  pub storage: StorageKind,
  /// Database file (defaults to `$XDG_DATA_HOME/paydash/session.db`)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Defaults to `$XDG_DATA_HOME/paydash/logs`
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./paydash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/paydash/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at {}\n\
                 See config.example.yaml for the format.",
        Self::default_location()
          .map(|p| p.display().to_string())
          .unwrap_or_else(|| "./paydash.yaml".to_string())
      )),
    }
  }

  fn default_location() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("paydash").join("config.yaml"))
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("paydash.yaml");
    if local.exists() {
      return Some(local);
    }

    Self::default_location().filter(|p| p.exists())
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    url::Url::parse(&config.api.base_url)
      .map_err(|e| eyre!("api.base_url '{}' is not a valid URL: {}", config.api.base_url, e))?;
    Ok(config)
  }
}
