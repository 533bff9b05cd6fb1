//! Configuration sections.

use nomos_sentinel::{EndpointType, Options};
use nomos_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Read or write endpoint, as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Reads a resource.
    Read,
    /// Creates or changes a resource.
    Write,
}

impl From<EndpointKind> for EndpointType {
    fn from(kind: EndpointKind) -> Self {
        match kind {
            EndpointKind::Read => Self::Read,
            EndpointKind::Write => Self::Write,
        }
    }
}

/// Validation switches.
///
/// Every flag defaults to `false`: all stages run, failures stop at the
/// first one and defaults are written into requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Skip request body validation.
    pub exclude_request_body: bool,

    /// Skip query parameter validation.
    pub exclude_request_query_params: bool,

    /// Skip response body validation.
    pub exclude_response_body: bool,

    /// Do not reject `readOnly` properties in requests.
    pub exclude_read_only_validations: bool,

    /// Do not reject `writeOnly` properties in responses.
    pub exclude_write_only_validations: bool,

    /// Fail on undocumented response statuses.
    pub include_response_status: bool,

    /// Do not write schema defaults into requests.
    pub skip_setting_defaults: bool,

    /// Collect every failure.
    pub multi_error: bool,

    /// Reject bodies sent to operations that declare none.
    pub reject_when_request_body_not_specified: bool,

    /// Drop undeclared properties before validating bodies.
    pub trim_additional_properties: bool,

    /// Read or write endpoint.
    pub endpoint_type: Option<EndpointKind>,
}

impl ValidationConfig {
    /// Builds sentinel options.
    ///
    /// The error formatter is not configurable from files and is left unset.
    pub fn to_options(&self) -> Options {
        let options = Options::new()
            .exclude_request_body(self.exclude_request_body)
            .exclude_request_query_params(self.exclude_request_query_params)
            .exclude_response_body(self.exclude_response_body)
            .exclude_read_only_validations(self.exclude_read_only_validations)
            .exclude_write_only_validations(self.exclude_write_only_validations)
            .include_response_status(self.include_response_status)
            .skip_setting_defaults(self.skip_setting_defaults)
            .multi_error(self.multi_error)
            .reject_when_request_body_not_specified(self.reject_when_request_body_not_specified)
            .trim_additional_properties(self.trim_additional_properties);
        match self.endpoint_type {
            Some(kind) => options.endpoint_type(kind.into()),
            None => options,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives (trace, debug, info, warn, error, or `EnvFilter` syntax).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log span open and close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include file and line number.
    #[serde(default)]
    pub include_location: bool,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include the event target.
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            include_location: false,
            thread_ids: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// The telemetry crate's logging configuration.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            span_events: self.span_events,
            file_line_info: self.include_location,
            thread_ids: self.thread_ids,
            include_target: self.include_target,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_defaults_match_options() {
        let options = ValidationConfig::default().to_options();
        assert!(!options.multi_error);
        assert!(!options.skip_setting_defaults);
        assert_eq!(options.endpoint_type, None);
    }

    #[test]
    fn test_endpoint_kind_maps() {
        let config = ValidationConfig {
            endpoint_type: Some(EndpointKind::Write),
            multi_error: true,
            ..Default::default()
        };
        let options = config.to_options();
        assert_eq!(options.endpoint_type, Some(EndpointType::Write));
        assert!(options.multi_error);
        assert!(options.response_schema_options().exclude_write_only);
    }

    #[test]
    fn test_unknown_validation_field_is_rejected() {
        let result: Result<ValidationConfig, _> = serde_json::from_str(r#"{"multi_errors": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_to_log_config() {
        let logging = LoggingConfig {
            include_location: true,
            format: LogFormat::Compact,
            ..Default::default()
        };
        let log = logging.to_log_config();
        assert!(log.file_line_info);
        assert_eq!(log.format, LogFormat::Compact);
        assert_eq!(log.level, "info");
    }
}
