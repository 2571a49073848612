//! Error types for Consul configuration management
//!
//! Validation errors are fatal to the calling operation: nothing is written
//! once any resource fails to validate.

use thiserror::Error;

use crate::check::CheckValidationError;
use crate::watch::WatchValidationError;

/// Main error type for rendering and applying configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A health check failed the check-type rules
    #[error("Invalid check '{resource}': {source}")]
    Check {
        resource: String,
        #[source]
        source: CheckValidationError,
    },

    /// A watch failed the watch-type rules
    #[error("Invalid watch '{resource}': {source}")]
    Watch {
        resource: String,
        #[source]
        source: WatchValidationError,
    },

    /// Two resources render to the same file name
    #[error("Duplicate file: {first} and {second} both render to {file}")]
    DuplicateFile {
        file: String,
        first: String,
        second: String,
    },

    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Manifest or settings parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Serialization error while rendering JSON
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The reload action could not be performed
    #[error("Reload failed: {0}")]
    ReloadFailed(String),
}

impl ConfigError {
    /// Create a check validation error for a named resource
    pub fn check(resource: impl Into<String>, source: CheckValidationError) -> Self {
        ConfigError::Check {
            resource: resource.into(),
            source,
        }
    }

    /// Create a watch validation error for a named resource
    pub fn watch(resource: impl Into<String>, source: WatchValidationError) -> Self {
        ConfigError::Watch {
            resource: resource.into(),
            source,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ConfigError::InvalidInput(msg.into())
    }

    /// Create a file error
    pub fn file_error(msg: impl Into<String>) -> Self {
        ConfigError::FileError(msg.into())
    }

    /// Create a parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        ConfigError::ParseError(msg.into())
    }

    /// True for validation failures (as opposed to I/O or reload problems)
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Check { .. } | ConfigError::Watch { .. } | ConfigError::DuplicateFile { .. }
        )
    }

    /// Check if this is a user-facing error (vs environmental)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Check { .. }
                | ConfigError::Watch { .. }
                | ConfigError::DuplicateFile { .. }
                | ConfigError::InvalidInput(_)
                | ConfigError::FileError(_)
                | ConfigError::ParseError(_)
        )
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::FileError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(format!("TOML error: {}", err))
    }
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
