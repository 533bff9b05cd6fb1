//! Main configuration type.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoggingConfig, ValidationConfig};

/// Complete nomos configuration.
///
/// # Example
///
/// ```
/// use nomos_config::NomosConfig;
///
/// let config = NomosConfig::default();
/// assert!(!config.validation.multi_error);
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct NomosConfig {
    /// Validation switches.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NomosConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the log level is empty while
    /// logging is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.enabled && self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                "must not be empty when logging is enabled",
            ));
        }
        Ok(())
    }

    /// Development preset: pretty debug logs, every failure reported,
    /// undocumented statuses rejected.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = nomos_telemetry::LogFormat::Pretty;
        config.logging.include_location = true;
        config.validation.multi_error = true;
        config.validation.include_response_status = true;
        config
    }

    /// Production preset: JSON logs at info level, response bodies not
    /// validated.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.format = nomos_telemetry::LogFormat::Json;
        config.validation.exclude_response_body = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        NomosConfig::default().validate().unwrap();
    }

    #[test]
    fn test_empty_level_is_invalid() {
        let mut config = NomosConfig::default();
        config.logging.level = "  ".to_string();
        assert!(config.validate().is_err());

        config.logging.enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn test_presets() {
        let dev = NomosConfig::development();
        assert!(dev.validation.multi_error);
        assert_eq!(dev.logging.level, "debug");

        let prod = NomosConfig::production();
        assert!(prod.validation.exclude_response_body);
        assert_eq!(prod.logging.format, nomos_telemetry::LogFormat::Json);
    }
}
