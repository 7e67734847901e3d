//! File-based configuration loading

use super::model::Config;
use crate::error::{ParleyError, ParleyResult};
use std::fs;
use std::path::Path;

/// Load configuration from a file
///
/// The format follows the extension: TOML, YAML, or JSON for anything else.
/// A missing file yields the default configuration.
pub fn load_from_file(path: &Path) -> ParleyResult<Config> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ParleyError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Check permissions of '{}'", path.display()),
        )
    })?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            ParleyError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Fix the syntax of '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            ParleyError::config_with_context(
                format!("Failed to parse YAML config: {}", e),
                format!("Fix the syntax of '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            ParleyError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Fix the syntax of '{}'", path.display()),
            )
        })?,
    };

    Ok(config)
}
