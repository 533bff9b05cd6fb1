//! Response validation.

use std::collections::HashMap;

use http::header::CONTENT_TYPE;
use http::{Method, StatusCode, Uri};
use nomos_core::{Parameter, Response};
use nomos_extract::{DecodeError, DecodeInput, Decoded, ParameterContext};
use nomos_telemetry::metrics::record_validation;
use tracing::{debug, instrument};

use crate::error::{ResponseError, ResponseErrorCause, ResponseTarget, ValidationError, ValidationResult};
use crate::input::ResponseValidationInput;
use crate::{outcome, Failures, Sentinel};

/// Statuses that carry no body worth checking.
const UNCHECKED_STATUSES: [StatusCode; 4] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::NOT_MODIFIED,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

impl Sentinel {
    /// Validates a response against its route.
    ///
    /// Uses the response declared for the exact status (or its range), then
    /// `default`. Headers are checked before the body.
    ///
    /// # Errors
    ///
    /// The first failure, or every failure as [`ValidationError::Multi`]
    /// when [`Options::multi_error`](crate::Options::multi_error) is set.
    #[instrument(skip_all, fields(operation = %input.route.operation_name(), status = input.response.status().as_u16()))]
    pub async fn validate_response(&self, input: ResponseValidationInput<'_>) -> ValidationResult {
        let result = self.run_response_stages(input).await;
        record_validation("response", outcome(&result));
        result
    }

    async fn run_response_stages(&self, input: ResponseValidationInput<'_>) -> ValidationResult {
        let status = input.response.status();
        if *input.request_method == Method::HEAD || UNCHECKED_STATUSES.contains(&status) {
            debug!(status = status.as_u16(), "response not inspected");
            return Ok(());
        }

        let responses = &input.route.operation.responses;
        let Some(declared) = responses
            .status(status.as_u16())
            .or_else(|| responses.default_response())
        else {
            if self.options.include_response_status {
                return Err(ResponseError::new(
                    ResponseTarget::Status,
                    status.as_u16(),
                    ResponseErrorCause::UndocumentedStatus,
                )
                .into());
            }
            return Ok(());
        };

        let mut failures = Failures::new(self.options.multi_error, input.route.operation_name());
        for header in declared.headers.values() {
            if header.name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            let result = self.validate_response_header(input, header);
            failures.record(result, "response_headers")?;
        }

        if !self.options.exclude_response_body {
            let result = self.validate_response_body(input, declared).await;
            failures.record(result, "response_body")?;
        }

        failures.finish()
    }

    fn validate_response_header(&self, input: ResponseValidationInput<'_>, header: &Parameter) -> ValidationResult {
        let status = input.response.status().as_u16();
        let fail = |cause: ResponseErrorCause| {
            ValidationError::from(ResponseError::new(
                ResponseTarget::Header(header.name.clone()),
                status,
                cause,
            ))
        };

        let no_path_params = HashMap::new();
        let uri = Uri::from_static("/");
        let ctx = ParameterContext::new(&no_path_params, &uri, input.response.headers())
            .map_err(|err| fail(err.into()))?;
        let decoded = match self.codec.decode(header, &ctx) {
            Ok(decoded) => decoded,
            Err(DecodeError::Document(err)) => return Err(err.into()),
            Err(DecodeError::Parse(err)) => return Err(fail(err.into())),
        };

        match decoded {
            Decoded::Absent if header.required => Err(fail(ResponseErrorCause::Required)),
            Decoded::Absent | Decoded::Empty => Ok(()),
            Decoded::Value(mut value) => match header.schema() {
                Some(schema) => self
                    .response_validator
                    .validate(schema, &mut value)
                    .map_err(|violation| fail(violation.into())),
                None => Ok(()),
            },
        }
    }

    async fn validate_response_body(&self, input: ResponseValidationInput<'_>, declared: &Response) -> ValidationResult {
        let status = input.response.status().as_u16();
        let fail = |cause: ResponseErrorCause| {
            ValidationError::from(ResponseError::new(ResponseTarget::Body, status, cause))
        };

        if declared.content.is_empty() {
            return Ok(());
        }
        let content_type = input
            .response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| fail(ResponseErrorCause::MissingContentType))?;
        let Some((_, media)) = declared.content.get(content_type) else {
            return Err(fail(ResponseErrorCause::UnexpectedContentType(content_type.to_string())));
        };
        let Some(schema) = media.schema.as_ref() else {
            return Ok(());
        };

        let decode_input = DecodeInput::new(content_type, &self.registry)
            .schema(Some(schema))
            .encoding(&media.encoding);
        let mut value = self
            .registry
            .decode(input.response.body().clone(), decode_input)
            .await
            .map_err(|err| fail(err.into()))?;
        self.response_validator
            .validate(schema, &mut value)
            .map_err(|violation| fail(violation.into()))
    }
}
