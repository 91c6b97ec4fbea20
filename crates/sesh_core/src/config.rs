//! Configuration for a session content root.

use crate::error::{Result, SeshError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file inside the content root.
pub const CONFIG_FILE: &str = "sesh.toml";

/// Configuration for a content root.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Storage locations.
    #[serde(default)]
    pub store: StoreConfig,

    /// Listing and query defaults.
    #[serde(default)]
    pub listing: ListingConfig,
}

impl Config {
    /// Load configuration from `<root>/sesh.toml`, or defaults if absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| SeshError::ConfigError(format!("failed to read config: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| SeshError::ConfigError(format!("failed to parse config: {}", e)))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `<root>/sesh.toml`.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = root.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)
            .map_err(|e| SeshError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| SeshError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }
}

/// Where sessions and the alias index live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Sessions directory, relative to the root unless absolute (default: "sessions").
    pub sessions_dir: String,

    /// Alias index file, relative to the root unless absolute
    /// (default: "session-aliases.json").
    pub aliases_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sessions_dir: "sessions".to_string(),
            aliases_file: "session-aliases.json".to_string(),
        }
    }
}

impl StoreConfig {
    /// Resolves the sessions directory against the content root.
    pub fn sessions_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.sessions_dir)
    }

    /// Resolves the alias index path against the content root.
    pub fn aliases_path(&self, root: &Path) -> PathBuf {
        root.join(&self.aliases_file)
    }
}

/// Defaults for query operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingConfig {
    /// Page size for session listings (default: 50).
    pub page_size: usize,

    /// Age window in days for "recent" sessions (default: 7).
    pub recent_days: u32,

    /// Number of aliases shown in summaries (default: 5).
    pub alias_preview: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            recent_days: 7,
            alias_preview: 5,
        }
    }
}
