use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::ClientSettings;
use crate::storage::StorageOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub storage: StorageOptions,
  /// Write logs to this file instead of stderr
  pub log_file: Option<PathBuf>,
}

/// API client settings. Durations are in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub base_url: String,
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  #[serde(default = "default_retry")]
  pub retry: u32,
  #[serde(default = "default_retry_delay_ms")]
  pub retry_delay_ms: u64,
  #[serde(default = "default_cache")]
  pub cache: bool,
  #[serde(default = "default_cache_ttl_ms")]
  pub cache_ttl_ms: u64,
  #[serde(default)]
  pub analytics: bool,
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_retry() -> u32 {
  3
}

fn default_retry_delay_ms() -> u64 {
  1_000
}

fn default_cache() -> bool {
  true
}

fn default_cache_ttl_ms() -> u64 {
  5 * 60 * 1_000
}

impl From<&ApiConfig> for ClientSettings {
  fn from(api: &ApiConfig) -> Self {
    ClientSettings {
      base_url: api.base_url.clone(),
      timeout: Duration::from_millis(api.timeout_ms),
      retry: api.retry,
      retry_delay: Duration::from_millis(api.retry_delay_ms),
      cache: api.cache,
      cache_ttl: Duration::from_millis(api.cache_ttl_ms),
      analytics: api.analytics,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fleetcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fleetcache/config.yaml
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
        "No configuration file found. Create one at ~/.config/fleetcache/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fleetcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fleetcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Get the API bearer token from the environment, if set.
  ///
  /// Checks FLEETCACHE_API_TOKEN.
  pub fn get_api_token() -> Option<String> {
    std::env::var("FLEETCACHE_API_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::Driver;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("api:\n  base_url: https://fleet.example/api\n").unwrap();

    let settings = ClientSettings::from(&config.api);
    assert_eq!(settings.base_url, "https://fleet.example/api");
    assert_eq!(settings.timeout, Duration::from_secs(10));
    assert_eq!(settings.retry, 3);
    assert_eq!(settings.retry_delay, Duration::from_secs(1));
    assert!(settings.cache);
    assert_eq!(settings.cache_ttl, Duration::from_secs(300));
    assert!(!settings.analytics);

    assert_eq!(config.storage.prefix, "fleet");
    assert_eq!(config.storage.driver, Driver::Memory);
    assert!(config.log_file.is_none());
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  base_url: http://localhost:8080
  timeout_ms: 2500
  retry: 1
  retry_delay_ms: 200
  cache: false
  cache_ttl_ms: 1000
  analytics: true
storage:
  prefix: garage
  driver: persistent
  compression: true
  path: /tmp/garage.db
log_file: /tmp/fleetcache.log
"#;
    let config = Config::parse(yaml).unwrap();
    let settings = ClientSettings::from(&config.api);

    assert_eq!(settings.timeout, Duration::from_millis(2500));
    assert_eq!(settings.retry, 1);
    assert!(!settings.cache);
    assert!(settings.analytics);
    assert_eq!(config.storage.prefix, "garage");
    assert_eq!(config.storage.driver, Driver::Persistent);
    assert!(config.storage.compression);
    assert!(!config.storage.encryption);
    assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/garage.db")));
    assert_eq!(config.log_file, Some(PathBuf::from("/tmp/fleetcache.log")));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "api:\n  base_url: http://fleet\n").unwrap();

    let config = Config::load(Some(path.as_path())).unwrap();
    assert_eq!(config.api.base_url, "http://fleet");
  }
}
