//! Validation options.
//!
//! [`Options`] switches stages off, selects multi-error mode and tunes the
//! schema validator. The schema-level part is turned into
//! [`ValidationOptions`] per direction by [`Options::request_schema_options`]
//! and [`Options::response_schema_options`].

use std::fmt;
use std::sync::Arc;

use nomos_core::SchemaError;
use nomos_schema::{Direction, ErrorFormatter, ValidationOptions};

/// Whether an endpoint reads or writes a resource.
///
/// A read endpoint may echo `readOnly` properties in its request body (a
/// query-by-example payload, for instance), so they are not rejected there.
/// A write endpoint may echo `writeOnly` properties back in its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    /// Reads a resource.
    Read,
    /// Creates or changes a resource.
    Write,
}

/// Options for a [`Sentinel`](crate::Sentinel).
#[derive(Clone, Default)]
pub struct Options {
    /// Skip request body validation.
    pub exclude_request_body: bool,
    /// Skip query parameter validation.
    pub exclude_request_query_params: bool,
    /// Skip response body validation.
    pub exclude_response_body: bool,
    /// Do not reject `readOnly` properties in request bodies.
    pub exclude_read_only_validations: bool,
    /// Do not reject `writeOnly` properties in response bodies.
    pub exclude_write_only_validations: bool,
    /// Fail on response statuses the operation does not document.
    pub include_response_status: bool,
    /// Do not write schema defaults into the request.
    pub skip_setting_defaults: bool,
    /// Collect every failure instead of stopping at the first one.
    pub multi_error: bool,
    /// Reject a non-empty body sent to an operation without a request body.
    pub reject_when_request_body_not_specified: bool,
    /// Drop undeclared properties from decoded bodies before validating.
    pub trim_additional_properties: bool,
    /// Read or write endpoint.
    pub endpoint_type: Option<EndpointType>,
    /// Custom message for schema errors.
    pub error_formatter: Option<ErrorFormatter>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("exclude_request_body", &self.exclude_request_body)
            .field("exclude_request_query_params", &self.exclude_request_query_params)
            .field("exclude_response_body", &self.exclude_response_body)
            .field("exclude_read_only_validations", &self.exclude_read_only_validations)
            .field("exclude_write_only_validations", &self.exclude_write_only_validations)
            .field("include_response_status", &self.include_response_status)
            .field("skip_setting_defaults", &self.skip_setting_defaults)
            .field("multi_error", &self.multi_error)
            .field(
                "reject_when_request_body_not_specified",
                &self.reject_when_request_body_not_specified,
            )
            .field("trim_additional_properties", &self.trim_additional_properties)
            .field("endpoint_type", &self.endpoint_type)
            .field("error_formatter", &self.error_formatter.is_some())
            .finish()
    }
}

impl Options {
    /// Default options: every stage on, fail fast, defaults written.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`Options::exclude_request_body`].
    pub fn exclude_request_body(mut self, exclude: bool) -> Self {
        self.exclude_request_body = exclude;
        self
    }

    /// Sets [`Options::exclude_request_query_params`].
    pub fn exclude_request_query_params(mut self, exclude: bool) -> Self {
        self.exclude_request_query_params = exclude;
        self
    }

    /// Sets [`Options::exclude_response_body`].
    pub fn exclude_response_body(mut self, exclude: bool) -> Self {
        self.exclude_response_body = exclude;
        self
    }

    /// Sets [`Options::exclude_read_only_validations`].
    pub fn exclude_read_only_validations(mut self, exclude: bool) -> Self {
        self.exclude_read_only_validations = exclude;
        self
    }

    /// Sets [`Options::exclude_write_only_validations`].
    pub fn exclude_write_only_validations(mut self, exclude: bool) -> Self {
        self.exclude_write_only_validations = exclude;
        self
    }

    /// Sets [`Options::include_response_status`].
    pub fn include_response_status(mut self, include: bool) -> Self {
        self.include_response_status = include;
        self
    }

    /// Sets [`Options::skip_setting_defaults`].
    pub fn skip_setting_defaults(mut self, skip: bool) -> Self {
        self.skip_setting_defaults = skip;
        self
    }

    /// Sets [`Options::multi_error`].
    pub fn multi_error(mut self, enabled: bool) -> Self {
        self.multi_error = enabled;
        self
    }

    /// Sets [`Options::reject_when_request_body_not_specified`].
    pub fn reject_when_request_body_not_specified(mut self, reject: bool) -> Self {
        self.reject_when_request_body_not_specified = reject;
        self
    }

    /// Sets [`Options::trim_additional_properties`].
    pub fn trim_additional_properties(mut self, enabled: bool) -> Self {
        self.trim_additional_properties = enabled;
        self
    }

    /// Sets [`Options::endpoint_type`].
    pub fn endpoint_type(mut self, endpoint_type: EndpointType) -> Self {
        self.endpoint_type = Some(endpoint_type);
        self
    }

    /// Sets [`Options::error_formatter`].
    pub fn error_formatter(
        mut self,
        formatter: impl Fn(&SchemaError) -> String + Send + Sync + 'static,
    ) -> Self {
        self.error_formatter = Some(Arc::new(formatter));
        self
    }

    fn schema_options(&self, direction: Direction) -> ValidationOptions {
        ValidationOptions {
            direction,
            multi_error: self.multi_error,
            trim_additional_properties: self.trim_additional_properties,
            error_formatter: self.error_formatter.clone(),
            ..ValidationOptions::default()
        }
    }

    /// Schema options for request parameters and bodies.
    pub fn request_schema_options(&self) -> ValidationOptions {
        let mut options = self.schema_options(Direction::Request);
        options.skip_defaults = self.skip_setting_defaults;
        options.exclude_read_only = self.exclude_read_only_validations
            || self.endpoint_type == Some(EndpointType::Read);
        options
    }

    /// Schema options for response headers and bodies.
    ///
    /// Defaults are never written into responses.
    pub fn response_schema_options(&self) -> ValidationOptions {
        let mut options = self.schema_options(Direction::Response);
        options.skip_defaults = true;
        options.exclude_write_only = self.exclude_write_only_validations
            || self.endpoint_type == Some(EndpointType::Write);
        options
    }
}
