//! Configuration loading and parsing
//!
//! A protocol file is optional. Any section left out keeps the built-in
//! protocol tables.

use anyhow::{Context, Result};
use psychopy_events::ProtocolConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// `[parser]`, `[normalizer]` and `[validator]` sections
    #[serde(flatten)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Write the events even if a protocol check fails
    #[serde(default)]
    pub skip_validation: bool,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
