//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, EndpointKind, NomosConfig};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use nomos_config::ConfigLoader;
///
/// # fn main() -> Result<(), nomos_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("nomos.toml")?
///     .with_env_prefix("NOMOS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: NomosConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: NomosConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = NomosConfig::default();
        self
    }

    /// Start with the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use nomos_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = NomosConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = NomosConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format (TOML or JSON) is determined by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `"toml"` or `"json"` format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use nomos_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [validation]
    ///     multi_error = true
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.validation.multi_error);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`, for
    /// example `NOMOS__VALIDATION__MULTI_ERROR=true` or
    /// `NOMOS__LOGGING__LEVEL=debug`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the current directory or its parents, if
    /// one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(err) if err.not_found() => Ok(self),
            Err(err) => Err(err.into()),
        }
    }

    /// Load environment variables from a specific file.
    ///
    /// Variables already set in the process are not overwritten.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable cannot be parsed or
    /// validation fails.
    pub fn load(mut self) -> Result<NomosConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> NomosConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<NomosConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::unsupported_format(path.display().to_string())),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(key, _)| key.starts_with(&marker))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let flag = || parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"));

        let validation = &mut self.config.validation;
        let logging = &mut self.config.logging;
        match parts.as_slice() {
            ["VALIDATION", "EXCLUDE_REQUEST_BODY"] => validation.exclude_request_body = flag()?,
            ["VALIDATION", "EXCLUDE_REQUEST_QUERY_PARAMS"] => {
                validation.exclude_request_query_params = flag()?;
            }
            ["VALIDATION", "EXCLUDE_RESPONSE_BODY"] => validation.exclude_response_body = flag()?,
            ["VALIDATION", "EXCLUDE_READ_ONLY_VALIDATIONS"] => {
                validation.exclude_read_only_validations = flag()?;
            }
            ["VALIDATION", "EXCLUDE_WRITE_ONLY_VALIDATIONS"] => {
                validation.exclude_write_only_validations = flag()?;
            }
            ["VALIDATION", "INCLUDE_RESPONSE_STATUS"] => validation.include_response_status = flag()?,
            ["VALIDATION", "SKIP_SETTING_DEFAULTS"] => validation.skip_setting_defaults = flag()?,
            ["VALIDATION", "MULTI_ERROR"] => validation.multi_error = flag()?,
            ["VALIDATION", "REJECT_WHEN_REQUEST_BODY_NOT_SPECIFIED"] => {
                validation.reject_when_request_body_not_specified = flag()?;
            }
            ["VALIDATION", "TRIM_ADDITIONAL_PROPERTIES"] => {
                validation.trim_additional_properties = flag()?;
            }
            ["VALIDATION", "ENDPOINT_TYPE"] => {
                validation.endpoint_type = match value.to_lowercase().as_str() {
                    "" | "none" => None,
                    "read" => Some(EndpointKind::Read),
                    "write" => Some(EndpointKind::Write),
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'read', 'write' or 'none'",
                        ))
                    }
                };
            }

            ["LOGGING", "ENABLED"] => logging.enabled = flag()?,
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = match value.to_lowercase().as_str() {
                    "json" => nomos_telemetry::LogFormat::Json,
                    "pretty" => nomos_telemetry::LogFormat::Pretty,
                    "compact" => nomos_telemetry::LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => logging.span_events = flag()?,
            ["LOGGING", "INCLUDE_LOCATION"] => logging.include_location = flag()?,
            ["LOGGING", "THREAD_IDS"] => logging.thread_ids = flag()?,
            ["LOGGING", "INCLUDE_TARGET"] => logging.include_target = flag()?,

            // Unknown keys are ignored
            _ => {}
        }

        Ok(())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomos_telemetry::LogFormat;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, NomosConfig::default());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validation.exclude_response_body);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"validation": {"endpoint_type": "read"}, "logging": {"format": "compact"}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.validation.endpoint_type, Some(EndpointKind::Read));
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.logging.include_target);
    }

    #[test]
    fn test_loader_unknown_section() {
        let result = ConfigLoader::new().with_string("[server]\nport = 1", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_unsupported_format() {
        let result = ConfigLoader::new().with_string("", "ini");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { ref format }) if format == "ini"));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/nomos.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/nomos.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, NomosConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    // Process environment is shared between tests, so overrides are tested
    // through apply_env_var rather than set_var.

    #[test]
    fn test_apply_env_var_validation() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__VALIDATION__MULTI_ERROR", "true", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__VALIDATION__ENDPOINT_TYPE", "write", "TEST")
            .unwrap();
        assert!(loader.config.validation.multi_error);
        assert_eq!(loader.config.validation.endpoint_type, Some(EndpointKind::Write));
    }

    #[test]
    fn test_apply_env_var_logging() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__LOGGING__LEVEL", "nomos_sentinel=debug", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__LOGGING__FORMAT", "pretty", "TEST")
            .unwrap();
        assert_eq!(loader.config.logging.level, "nomos_sentinel=debug");
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__VALIDATION__MULTI_ERROR", "sometimes", "TEST")
            .is_err());
        let err = loader
            .apply_env_var("TEST__VALIDATION__ENDPOINT_TYPE", "delete", "TEST")
            .unwrap_err();
        assert_eq!(err.field().as_deref(), Some("validation.endpoint_type"));
        let err = loader
            .apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST")
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { ref var, .. } if var == "TEST__LOGGING__FORMAT"));
    }

    #[test]
    fn test_apply_env_var_unknown_key_is_ignored() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__SERVER__PORT", "8080", "TEST")
            .unwrap();
        assert_eq!(loader.config, NomosConfig::default());
    }
}
