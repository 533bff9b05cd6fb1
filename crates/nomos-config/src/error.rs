//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling a [`NomosConfig`](crate::NomosConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file exists but cannot be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML, or a key outside the `validation` and `logging` tables.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Malformed JSON, or a key outside the `validation` and `logging` objects.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A `.env` file could not be loaded.
    #[error("failed to load environment file: {0}")]
    DotenvError(#[from] dotenvy::Error),

    /// The source is neither TOML nor JSON.
    #[error("unsupported configuration format '{format}' (expected toml or json)")]
    UnsupportedFormat {
        /// Format name or file path as given.
        format: String,
    },

    /// A loaded value is rejected, e.g. an empty `logging.level`.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted key such as `logging.level`.
        field: String,
        /// Why the value is rejected.
        reason: String,
    },

    /// An override variable such as `NOMOS__VALIDATION__MULTI_ERROR` holds
    /// a value of the wrong shape.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// What the variable should hold.
        reason: String,
    },
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// The dotted configuration key this error concerns, when known.
    ///
    /// Environment overrides map back to their key, so
    /// `NOMOS__LOGGING__FORMAT` yields `logging.format`.
    #[must_use]
    pub fn field(&self) -> Option<String> {
        match self {
            Self::InvalidValue { field, .. } => Some(field.clone()),
            Self::EnvParseError { var, .. } => {
                let mut parts = var.split("__").skip(1);
                let section = parts.next()?;
                let key = parts.next()?;
                Some(format!("{}.{}", section.to_lowercase(), key.to_lowercase()))
            }
            _ => None,
        }
    }
}
