//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;

use super::xlines::XLinesConfig;
use crate::error::ConfigError;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// X-line enforcement and static lines.
    #[serde(default)]
    pub xlines: XLinesConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.straylight.net").
    pub name: String,
    /// Server ID for TS6 (3 characters), used as the session UID prefix.
    #[serde(default = "default_sid")]
    pub sid: String,
}

fn default_sid() -> String {
    "001".to_string()
}
