use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::{DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT, MAX_LIST_LIMIT, MAX_SEARCH_LIMIT};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_list_limit")]
    pub default_list_limit: u32,

    #[serde(default = "max_list_limit")]
    pub max_list_limit: u32,

    #[serde(default = "default_search_limit")]
    pub default_search_limit: u32,

    #[serde(default = "max_search_limit")]
    pub max_search_limit: u32,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Added to every article saved from a URL.
    #[serde(default)]
    pub default_tags: Vec<String>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("speedy-pocket");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("pocket.db").to_string_lossy().to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_list_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

fn max_list_limit() -> u32 {
    MAX_LIST_LIMIT
}

fn default_search_limit() -> u32 {
    DEFAULT_SEARCH_LIMIT
}

fn max_search_limit() -> u32 {
    MAX_SEARCH_LIMIT
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            default_list_limit: default_list_limit(),
            max_list_limit: max_list_limit(),
            default_search_limit: default_search_limit(),
            max_search_limit: max_search_limit(),
            fetch_timeout_secs: default_fetch_timeout(),
            default_tags: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads `path`, writing a default config there first if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.db_path.trim().is_empty() {
            return Err(AppError::Config("db_path must not be empty".into()));
        }
        if self.max_list_limit == 0 || self.max_search_limit == 0 {
            return Err(AppError::Config("limits must be at least 1".into()));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("speedy-pocket")
            .join("config.toml")
    }
}
