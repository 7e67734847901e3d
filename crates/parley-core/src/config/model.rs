//! Configuration model

use crate::error::{ParleyError, ParleyResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn data_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(name)
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the completion API
    pub api_host: String,
    /// Value for the `X-API-KEY` header
    pub api_key: Option<String>,
    pub default_model: String,
    /// Overall request timeout in seconds
    pub request_timeout: u64,
    /// Use buffered responses instead of incremental ones
    pub disable_streaming: bool,
    /// Directory of cached responses
    pub cache_path: PathBuf,
    /// Max number of cached responses
    pub cache_length: usize,
    /// Directory of chat files
    pub chat_cache_path: PathBuf,
    /// Max number of messages kept per chat, besides the system message
    pub chat_cache_length: usize,
    pub role_storage_path: PathBuf,
    pub use_functions: bool,
    pub show_functions_output: bool,
    /// Max number of function calls answered within one completion
    pub max_function_depth: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Color name for plain-text output
    pub default_color: String,
    pub shell_interaction: bool,
    pub default_execute_shell_cmd: bool,
    pub prettify_markdown: bool,
}

impl Default for Config {
    fn default() -> Self {
        let role_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("roles");
        Self {
            api_host: "http://localhost:8080".to_string(),
            api_key: None,
            default_model: "meta-llama3.1-70b-instruct".to_string(),
            request_timeout: 60,
            disable_streaming: false,
            cache_path: data_dir("parley_cache"),
            cache_length: 100,
            chat_cache_path: data_dir("parley_chat_cache"),
            chat_cache_length: 100,
            role_storage_path: role_dir,
            use_functions: false,
            show_functions_output: false,
            max_function_depth: 8,
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 2048,
            default_color: "magenta".to_string(),
            shell_interaction: true,
            default_execute_shell_cmd: false,
            prettify_markdown: true,
        }
    }
}

impl Config {
    /// Check value ranges
    pub fn validate(&self) -> ParleyResult<()> {
        if self.api_host.trim().is_empty() {
            return Err(ParleyError::config("api_host must not be empty"));
        }
        if self.default_model.trim().is_empty() {
            return Err(ParleyError::config("default_model must not be empty"));
        }
        if self.request_timeout == 0 {
            return Err(ParleyError::config("request_timeout must be positive"));
        }
        if self.cache_length == 0 || self.chat_cache_length == 0 {
            return Err(ParleyError::config(
                "cache_length and chat_cache_length must be positive",
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ParleyError::config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ParleyError::config(format!(
                "top_p must be within 0.0..=1.0, got {}",
                self.top_p
            )));
        }
        Ok(())
    }

    /// Config with every path expanded
    pub fn expanded(mut self) -> Self {
        self.cache_path = super::expand_path(&self.cache_path);
        self.chat_cache_path = super::expand_path(&self.chat_cache_path);
        self.role_storage_path = super::expand_path(&self.role_storage_path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_length, 100);
        assert_eq!(config.max_function_depth, 8);
        assert!(!config.disable_streaming);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let config = Config {
            temperature: 3.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            top_p: -0.1,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            chat_cache_length: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            api_host: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("default_model = \"mistral\"\n").unwrap();
        assert_eq!(config.default_model, "mistral");
        assert_eq!(config.request_timeout, 60);
    }
}
