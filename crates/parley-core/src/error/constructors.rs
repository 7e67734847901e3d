//! Constructor methods for ParleyError

use super::types::ParleyError;
use std::path::Path;

impl ParleyError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with a hint for the user
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a transport error without a status code
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a transport error for an HTTP status
    pub fn transport_status(status_code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an authentication error pointing at the config file to fix
    pub fn auth(status_code: u16, config_path: &Path) -> Self {
        Self::Auth {
            status_code,
            hint: format!(
                "Invalid API key, update your config file: {}",
                config_path.display()
            ),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            line: None,
        }
    }

    /// Create a decode error that keeps the offending line
    pub fn decode_line(message: impl Into<String>, line: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            line: Some(line.into()),
        }
    }

    /// Create a function invocation error
    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            context: None,
        }
    }

    /// Create a storage error with context
    pub fn storage_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error naming the field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
        }
    }

    /// Create an IO error for a path
    pub fn io_at(path: &Path, message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.to_path_buf()),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}
