//! `quiver.toml` loading.
//!
//! Both tables are optional; a missing file means all defaults.

use quiver_core::{EngineConfig, ProviderConfig, QuiverError, QuiverResult};
use serde::Deserialize;
use std::path::Path;

/// Parsed contents of `quiver.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuiverConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl QuiverConfig {
    /// Fills an absent HTTP `api_key` from `fallback` (the `QUIVER_API_KEY`
    /// environment variable in the CLI). Keys set in the file win.
    pub fn with_api_key_fallback(mut self, fallback: Option<String>) -> Self {
        if let ProviderConfig::Http { api_key, .. } = &mut self.provider {
            if api_key.is_none() {
                *api_key = fallback;
            }
        }
        self
    }
}

/// Reads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> QuiverResult<QuiverConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file, using defaults");
        return Ok(QuiverConfig::default());
    }
    parse_config(path)
}

/// Read and parse a TOML config file into a [`QuiverConfig`].
pub fn parse_config(path: &Path) -> QuiverResult<QuiverConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        QuiverError::Config(format!(
            "Failed to read config '{}': {}",
            path.display(),
            e
        ))
    })?;
    let config: QuiverConfig = toml::from_str(&content).map_err(|e| {
        QuiverError::Config(format!(
            "Failed to parse config '{}': {}",
            path.display(),
            e
        ))
    })?;
    config.engine.validate()?;
    Ok(config)
}
