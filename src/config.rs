use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default number of sources refreshed at the same time
pub const DEFAULT_MAX_PARALLEL_REFRESH: usize = 4;

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub cache: CacheConfig,
    pub refresh: RefreshConfig,
    pub log: LogConfig,
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Database location; defaults to [`db_path`]
    pub db_path: Option<PathBuf>,
}

/// Refresh-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshConfig {
    pub max_parallel: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL_REFRESH,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Database path, honoring the configured override
    pub fn db_path(&self) -> PathBuf {
        self.cache.db_path.clone().unwrap_or_else(db_path)
    }
}

/// Returns the path to the data directory for synthesis-cache.
/// Uses $XDG_DATA_HOME/synthesis-cache if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/synthesis-cache,
/// or ./synthesis-cache if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("packages.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("synthesis-cache.log")
}

/// Returns the default configuration file path.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("synthesis-cache")
}
