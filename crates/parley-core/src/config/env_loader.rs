//! Environment variable overrides
//!
//! Every config key can be overridden by `PARLEY_<KEY>` in upper case, e.g.
//! `PARLEY_API_KEY` or `PARLEY_CACHE_LENGTH`.

use super::model::Config;
use crate::error::{ParleyError, ParleyResult};
use std::path::PathBuf;
use std::str::FromStr;

const PREFIX: &str = "PARLEY_";

/// Apply overrides from the process environment
pub fn apply_env(config: &mut Config) -> ParleyResult<()> {
    apply_env_with(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary variable lookup
pub fn apply_env_with<F>(config: &mut Config, lookup: F) -> ParleyResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(&format!("{}{}", PREFIX, key));

    if let Some(v) = var("API_HOST") {
        config.api_host = v;
    }
    if let Some(v) = var("API_KEY") {
        config.api_key = Some(v);
    }
    if let Some(v) = var("DEFAULT_MODEL") {
        config.default_model = v;
    }
    if let Some(v) = var("DEFAULT_COLOR") {
        config.default_color = v;
    }
    if let Some(v) = var("CACHE_PATH") {
        config.cache_path = PathBuf::from(v);
    }
    if let Some(v) = var("CHAT_CACHE_PATH") {
        config.chat_cache_path = PathBuf::from(v);
    }
    if let Some(v) = var("ROLE_STORAGE_PATH") {
        config.role_storage_path = PathBuf::from(v);
    }

    set_parsed(&var, "REQUEST_TIMEOUT", &mut config.request_timeout)?;
    set_parsed(&var, "CACHE_LENGTH", &mut config.cache_length)?;
    set_parsed(&var, "CHAT_CACHE_LENGTH", &mut config.chat_cache_length)?;
    set_parsed(&var, "MAX_FUNCTION_DEPTH", &mut config.max_function_depth)?;
    set_parsed(&var, "TEMPERATURE", &mut config.temperature)?;
    set_parsed(&var, "TOP_P", &mut config.top_p)?;
    set_parsed(&var, "MAX_TOKENS", &mut config.max_tokens)?;

    set_flag(&var, "DISABLE_STREAMING", &mut config.disable_streaming)?;
    set_flag(&var, "USE_FUNCTIONS", &mut config.use_functions)?;
    set_flag(&var, "SHOW_FUNCTIONS_OUTPUT", &mut config.show_functions_output)?;
    set_flag(&var, "SHELL_INTERACTION", &mut config.shell_interaction)?;
    set_flag(&var, "DEFAULT_EXECUTE_SHELL_CMD", &mut config.default_execute_shell_cmd)?;
    set_flag(&var, "PRETTIFY_MARKDOWN", &mut config.prettify_markdown)?;

    Ok(())
}

fn set_parsed<T, V>(var: &V, key: &str, target: &mut T) -> ParleyResult<()>
where
    T: FromStr,
    V: Fn(&str) -> Option<String>,
{
    if let Some(raw) = var(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ParleyError::config(format!("Invalid {}{} value: {}", PREFIX, key, raw)))?;
    }
    Ok(())
}

fn set_flag<V>(var: &V, key: &str, target: &mut bool) -> ParleyResult<()>
where
    V: Fn(&str) -> Option<String>,
{
    if let Some(raw) = var(key) {
        *target = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ParleyError::config(format!(
                    "Invalid {}{} value: {}",
                    PREFIX, key, raw
                )));
            }
        };
    }
    Ok(())
}
