//! Configuration management for episodeplay
//!
//! Handles config file loading/saving.
//! Config is stored at ~/.config/episodeplay/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::sync::{DEFAULT_BASE_URL, DEFAULT_SERVER_PREFERENCE_PATH};
use crate::storage::FileStore;

/// Filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "episodeplay=info";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL for sync calls
    pub api_base_url: Option<String>,
    /// Key-value store file (progress, settings, preferred server)
    pub store_path: Option<PathBuf>,
    /// tracing filter directive, e.g. "episodeplay=debug"
    pub log_filter: Option<String>,
    /// Touch points at which a device is treated as touch-capable
    pub touch_points_threshold: Option<u32>,
    /// Backend path that receives the preferred server
    pub server_preference_path: Option<String>,
}

impl Config {
    /// Get config file path (~/.config/episodeplay/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("episodeplay").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Load config from `path`; missing or malformed files yield defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                Self::default()
            }
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Backend URL with fallback chain:
    /// 1. Environment variable EPISODEPLAY_API_URL
    /// 2. Config file
    /// 3. Built-in default
    pub fn api_base_url(&self) -> String {
        if let Ok(url) = std::env::var("EPISODEPLAY_API_URL") {
            if !url.trim().is_empty() {
                return url;
            }
        }
        self.api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Store file; `None` only when no data directory exists
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store_path.clone().or_else(FileStore::default_path)
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn touch_points_threshold(&self) -> u32 {
        self.touch_points_threshold.unwrap_or(1).max(1)
    }

    pub fn server_preference_path(&self) -> &str {
        self.server_preference_path
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_PREFERENCE_PATH)
    }
}
