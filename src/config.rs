//! Viewer settings.
//!
//! Defaults cover everything; with the `config` feature a TOML file can override them, and
//! command-line flags override both.

use crate::error::{NdjviewError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Rows rendered beyond each edge of the viewport
    pub overscan: usize,
    /// Height assumed for rows that have not been laid out yet
    pub estimated_row_height: u32,
    pub search_debounce_ms: u64,
    pub timeline_buckets: usize,
    /// Redraw interval while streaming
    pub tick_rate_ms: u64,
    /// Start pinned to the newest records
    pub follow: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            overscan: 5,
            estimated_row_height: 1,
            search_debounce_ms: 300,
            timeline_buckets: 8,
            tick_rate_ms: 50,
            follow: true,
        }
    }
}

impl ViewerConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.estimated_row_height == 0 {
            return Err(NdjviewError::config("estimated_row_height must be at least 1"));
        }
        if self.timeline_buckets == 0 {
            return Err(NdjviewError::config("timeline_buckets must be at least 1"));
        }
        if self.tick_rate_ms == 0 {
            return Err(NdjviewError::config("tick_rate_ms must be at least 1"));
        }
        Ok(())
    }

    /// Parse settings from TOML text; missing keys keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| NdjviewError::config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "config")]
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            NdjviewError::config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&contents)
    }

    /// `<config_dir>/ndjview/config.toml`, if the platform has a config directory.
    #[cfg(feature = "config")]
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ndjview").join("config.toml"))
    }

    /// Load the per-user config file, falling back to defaults when it does not exist.
    #[cfg(feature = "config")]
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::info!("loading config from {}", path.display());
                Self::load_from(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}
