//! Configuration management for Parley
//!
//! Values are layered: built-in defaults, then the config file, then
//! `PARLEY_*` environment variables. Command-line overrides are applied by the
//! binary on top of the result.

mod env_loader;
mod file_loader;
mod model;

pub use env_loader::{apply_env, apply_env_with};
pub use file_loader::load_from_file;
pub use model::Config;

use crate::error::ParleyResult;
use std::path::{Path, PathBuf};

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parley")
        .join("config.toml")
}

/// Load configuration from `path` and the process environment, then validate it
pub fn load_config(path: &Path) -> ParleyResult<Config> {
    let mut config = load_from_file(path)?;
    apply_env(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(shellexpand::tilde(&raw).into_owned()),
    }
}
