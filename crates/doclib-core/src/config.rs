//! Configuration types for the document library.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the library store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Recent-files configuration.
    #[serde(default)]
    pub recents: RecentsConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,

    /// Enable WAL mode (recommended).
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// SQLite cache size in KB (negative = KB, positive = pages).
    #[serde(default = "default_cache_size")]
    pub cache_size: i32,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            wal_mode: true,
            cache_size: -16000, // 16MB
            busy_timeout_ms: 30000,
        }
    }
}

/// Recent-files configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentsConfig {
    /// Default number of rows returned when the caller does not pass a
    /// limit.
    #[serde(default = "default_recent_limit")]
    pub default_limit: i64,
}

impl Default for RecentsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_recent_limit(),
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_cache_size() -> i32 {
    -16000
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_recent_limit() -> i64 {
    50
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("doclib")
        .join("library.db")
}

impl LibraryConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::LibraryError::config(format!("Failed to parse config: {}", e))
        })?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> crate::error::Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("doclib").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("doclib.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        // Return defaults
        Ok(Self::default())
    }
}
