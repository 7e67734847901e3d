//! Core error type

use thiserror::Error;

/// Result type alias for Parley operations
pub type ParleyResult<T> = Result<T, ParleyError>;

/// Main error type for Parley
#[derive(Error, Debug, Clone)]
pub enum ParleyError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Network or protocol failure talking to the completion API
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
    },

    /// The API rejected the credentials (401 or 403)
    #[error("Authentication failed ({status_code}): {hint}")]
    Auth { status_code: u16, hint: String },

    /// A content-bearing record could not be decoded
    #[error("Decode error: {message}")]
    Decode {
        message: String,
        line: Option<String>,
    },

    /// A requested function failed, is unknown, or the call chain ran too deep
    #[error("Function error: {name}: {message}")]
    Function { name: String, message: String },

    /// The request conflicts with stored state, e.g. a chat resumed under another role
    #[error("{message}")]
    Usage { message: String },

    /// Conversation or role storage failure
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// Response cache failure
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Invalid input
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<std::path::PathBuf>,
    },

    /// JSON serialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// The consumer stopped the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Anything else
    #[error("{message}")]
    Other { message: String },
}

impl ParleyError {
    /// Short machine-readable code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ParleyError::Config { .. } => "PARLEY_CONFIG",
            ParleyError::Transport { .. } => "PARLEY_TRANSPORT",
            ParleyError::Auth { .. } => "PARLEY_AUTH",
            ParleyError::Decode { .. } => "PARLEY_DECODE",
            ParleyError::Function { .. } => "PARLEY_FUNCTION",
            ParleyError::Usage { .. } => "PARLEY_USAGE",
            ParleyError::Storage { .. } => "PARLEY_STORAGE",
            ParleyError::Cache { .. } => "PARLEY_CACHE",
            ParleyError::InvalidInput { .. } => "PARLEY_INVALID_INPUT",
            ParleyError::Io { .. } => "PARLEY_IO",
            ParleyError::Json { .. } => "PARLEY_JSON",
            ParleyError::Cancelled => "PARLEY_CANCELLED",
            ParleyError::Other { .. } => "PARLEY_OTHER",
        }
    }

    /// Whether a caller may reasonably retry the request.
    ///
    /// Nothing inside the core retries; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            ParleyError::Transport { status_code, .. } => match status_code {
                Some(code) => *code == 429 || *code >= 500,
                None => true,
            },
            _ => false,
        }
    }

    /// Remediation text to show next to the error, if any
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ParleyError::Auth { hint, .. } => Some(hint),
            ParleyError::Config { context, .. } => context.as_deref(),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C: std::fmt::Display>(self, context: C) -> ParleyResult<T>;

    /// Add context lazily (only evaluated on error)
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> ParleyResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context<C: std::fmt::Display>(self, context: C) -> ParleyResult<T> {
        self.map_err(|e| ParleyError::other(format!("{}: {}", context, e)))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> ParleyResult<T> {
        self.map_err(|e| ParleyError::other(format!("{}: {}", f(), e)))
    }
}

/// Extension trait for converting Options into Results
pub trait OptionExt<T> {
    /// Convert Option to Result with context message
    fn context<C: std::fmt::Display>(self, context: C) -> ParleyResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> ParleyResult<T> {
        self.ok_or_else(|| ParleyError::other(context.to_string()))
    }
}
