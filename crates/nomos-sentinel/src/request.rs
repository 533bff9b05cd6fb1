//! Request validation.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use http::uri::PathAndQuery;
use http::{HeaderName, HeaderValue, Request, Uri};
use nomos_core::{Location, Parameter, ParameterValue, ParseError, SecurityRequirement, Style};
use nomos_extract::encode::{append_query, encode_cookie, encode_header, encode_query};
use nomos_extract::{DecodeError, DecodeInput, Decoded, ParameterContext};
use nomos_telemetry::metrics::record_validation;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{
    AuthenticationError, RequestError, RequestErrorCause, SecurityRequirementsError,
    ValidationError, ValidationResult,
};
use crate::input::RequestValidationInput;
use crate::security::AuthenticationInput;
use crate::{outcome, Failures, Sentinel};

impl Sentinel {
    /// Validates a request against its route.
    ///
    /// Runs parameters, then the body, then security requirements. Defaults
    /// of absent optional parameters are written into the request, and the
    /// body is replaced when validation changed its decoded value.
    ///
    /// # Errors
    ///
    /// The first failure, or every failure as [`ValidationError::Multi`]
    /// when [`Options::multi_error`](crate::Options::multi_error) is set.
    #[instrument(skip_all, fields(operation = %input.route.operation_name()))]
    pub async fn validate_request(&self, input: &mut RequestValidationInput<'_>) -> ValidationResult {
        let result = self.run_request_stages(input).await;
        record_validation("request", outcome(&result));
        result
    }

    async fn run_request_stages(&self, input: &mut RequestValidationInput<'_>) -> ValidationResult {
        let route = input.route;
        let mut failures = Failures::new(self.options.multi_error, route.operation_name());

        let inherited = route
            .path_item
            .parameters
            .iter()
            .filter(|parameter| !route.operation.overrides(parameter));
        for parameter in inherited.chain(&route.operation.parameters) {
            if parameter.location == Location::Query && self.options.exclude_request_query_params {
                continue;
            }
            let result = self.validate_parameter(input, parameter);
            failures.record(result, "parameters")?;
        }

        if !self.options.exclude_request_body {
            let result = self.validate_request_body(input).await;
            failures.record(result, "body")?;
        }

        let requirements = route
            .operation
            .security
            .as_deref()
            .unwrap_or(&route.document.security);
        let result = self.validate_security_requirements(input, requirements).await;
        failures.record(result, "security")?;

        failures.finish()
    }

    /// Decodes and validates one parameter.
    ///
    /// An absent optional parameter with a default gets the default written
    /// into the request.
    ///
    /// # Errors
    ///
    /// A [`RequestError`] naming the parameter, or a document error when the
    /// parameter's serialization cannot be decoded.
    pub fn validate_parameter(
        &self,
        input: &mut RequestValidationInput<'_>,
        parameter: &Parameter,
    ) -> ValidationResult {
        let fail = |cause: RequestErrorCause| {
            ValidationError::from(RequestError::parameter(
                parameter.name.as_str(),
                parameter.location,
                cause,
            ))
        };

        let decoded = {
            let request = &*input.request;
            let ctx = ParameterContext::new(&input.route.path_params, request.uri(), request.headers())
                .map_err(|err| fail(err.into()))?;
            match self.codec.decode(parameter, &ctx) {
                Ok(decoded) => decoded,
                Err(DecodeError::Document(err)) => return Err(err.into()),
                Err(DecodeError::Parse(err)) => return Err(fail(err.into())),
            }
        };

        match decoded {
            Decoded::Absent if parameter.required => Err(fail(RequestErrorCause::Required)),
            Decoded::Absent => {
                if self.options.skip_setting_defaults {
                    return Ok(());
                }
                let Some(default) = parameter.schema().and_then(|schema| schema.effective_default())
                else {
                    return Ok(());
                };
                debug!(parameter = %parameter.name, location = %parameter.location, "writing parameter default");
                write_default(&mut *input.request, parameter, default).map_err(|err| fail(err.into()))
            }
            Decoded::Empty if parameter.allow_empty_value => Ok(()),
            Decoded::Empty => Err(fail(RequestErrorCause::EmptyValue)),
            Decoded::Value(mut value) => {
                let Some(schema) = parameter.schema() else {
                    return Ok(());
                };
                let hint = query_hint(parameter, &value);
                self.request_validator
                    .validate(schema, &mut value)
                    .map_err(|violation| {
                        let mut error = RequestError::parameter(
                            parameter.name.as_str(),
                            parameter.location,
                            violation,
                        );
                        error.hint = hint;
                        error.into()
                    })
            }
        }
    }

    /// Decodes and validates the request body.
    ///
    /// # Errors
    ///
    /// A [`RequestError`] for the body.
    pub async fn validate_request_body(&self, input: &mut RequestValidationInput<'_>) -> ValidationResult {
        let fail = |cause: RequestErrorCause| ValidationError::from(RequestError::body(cause));
        let request = &mut *input.request;

        let Some(declared) = &input.route.operation.request_body else {
            if self.options.reject_when_request_body_not_specified && !request.body().is_empty() {
                return Err(fail(RequestErrorCause::BodyNotSpecified));
            }
            return Ok(());
        };

        if request.body().is_empty() {
            return if declared.required {
                Err(fail(RequestErrorCause::Required))
            } else {
                Ok(())
            };
        }

        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| fail(RequestErrorCause::MissingContentType))?;
        let Some((_, media)) = declared.content.get(&content_type) else {
            return Err(fail(RequestErrorCause::UnexpectedContentType(content_type)));
        };
        let Some(schema) = media.schema.as_ref() else {
            return Ok(());
        };

        let decode_input = DecodeInput::new(&content_type, &self.registry)
            .schema(Some(schema))
            .encoding(&media.encoding);
        let decoded = self
            .registry
            .decode(request.body().clone(), decode_input)
            .await
            .map_err(|err| fail(err.into()))?;

        let mut value = decoded.clone();
        self.request_validator
            .validate(schema, &mut value)
            .map_err(|violation| fail(violation.into()))?;

        if value != decoded {
            replace_body(request, &value, &content_type, &self.registry);
        }
        Ok(())
    }

    /// Checks security requirement alternatives.
    ///
    /// Alternatives are tried in order and the first one whose schemes all
    /// pass wins. An empty list, or an empty alternative, always passes.
    ///
    /// # Errors
    ///
    /// A document error when a requirement names an undeclared scheme,
    /// otherwise [`SecurityRequirementsError`] with one cause per
    /// alternative.
    pub async fn validate_security_requirements(
        &self,
        input: &RequestValidationInput<'_>,
        requirements: &[SecurityRequirement],
    ) -> ValidationResult {
        if requirements.is_empty() || requirements.iter().any(SecurityRequirement::is_empty) {
            return Ok(());
        }

        let document = &input.route.document;
        for requirement in requirements {
            for (name, _) in requirement.iter() {
                document.security_scheme(name)?;
            }
        }

        let Some(authenticator) = &self.authenticator else {
            return Err(SecurityRequirementsError {
                requirements: requirements.to_vec(),
                errors: requirements
                    .iter()
                    .map(|_| AuthenticationError::NoAuthenticator)
                    .collect(),
            }
            .into());
        };

        let mut errors = Vec::with_capacity(requirements.len());
        'alternatives: for requirement in requirements {
            for (name, scopes) in requirement.iter() {
                let authentication = AuthenticationInput {
                    scheme_name: name,
                    scheme: document.security_scheme(name)?,
                    scopes,
                    request: &*input.request,
                };
                if let Err(err) = authenticator.authenticate(authentication).await {
                    debug!(scheme = name, error = %err, "security scheme rejected the request");
                    errors.push(err);
                    continue 'alternatives;
                }
            }
            return Ok(());
        }

        Err(SecurityRequirementsError {
            requirements: requirements.to_vec(),
            errors,
        }
        .into())
    }
}

/// The corrected query string for an exploded form array that arrived as
/// one comma-joined value, like `status=a,b` for `status=a&status=b`.
fn query_hint(parameter: &Parameter, value: &Value) -> Option<String> {
    if parameter.location != Location::Query {
        return None;
    }
    let method = parameter.serialization_method()?;
    if method.style != Style::Form || !method.explode {
        return None;
    }
    let Value::Array(items) = value else {
        return None;
    };
    let [Value::String(joined)] = items.as_slice() else {
        return None;
    };
    if !joined.contains(',') {
        return None;
    }
    let pairs: Vec<(String, String)> = joined
        .split(',')
        .map(|item| (parameter.name.clone(), item.to_string()))
        .collect();
    Some(format!("?{}", append_query(None, &pairs)))
}

fn write_default(request: &mut Request<Bytes>, parameter: &Parameter, value: &Value) -> Result<(), ParseError> {
    let content = matches!(parameter.value, ParameterValue::Content { .. });
    match parameter.location {
        Location::Path => Ok(()),
        Location::Query => {
            let pairs = if content {
                vec![(parameter.name.clone(), value.to_string())]
            } else {
                encode_query(parameter, value)
            };
            set_query(request, &pairs)
        }
        Location::Header => {
            let text = if content {
                value.to_string()
            } else {
                encode_header(parameter, value)
            };
            insert_header(request, &parameter.name, &text)
        }
        Location::Cookie => {
            let pair = if content {
                format!("{}={value}", parameter.name)
            } else {
                encode_cookie(parameter, value)
            };
            let cookie = match request.headers().get(COOKIE).and_then(|v| v.to_str().ok()) {
                Some(existing) if !existing.trim().is_empty() => format!("{existing}; {pair}"),
                _ => pair,
            };
            insert_header(request, COOKIE.as_str(), &cookie)
        }
    }
}

fn set_query(request: &mut Request<Bytes>, pairs: &[(String, String)]) -> Result<(), ParseError> {
    let query = append_query(request.uri().query(), pairs);
    let mut parts = request.uri().clone().into_parts();
    let path = parts
        .path_and_query
        .as_ref()
        .map_or_else(|| "/".to_string(), |pq| pq.path().to_string());
    let path_and_query = PathAndQuery::try_from(format!("{path}?{query}"))
        .map_err(|err| ParseError::other("default does not form a valid query").with_source(err))?;
    parts.path_and_query = Some(path_and_query);
    *request.uri_mut() = Uri::from_parts(parts)
        .map_err(|err| ParseError::other("default does not form a valid URI").with_source(err))?;
    Ok(())
}

fn insert_header(request: &mut Request<Bytes>, name: &str, text: &str) -> Result<(), ParseError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| ParseError::other("invalid header name").with_source(err))?;
    let value = HeaderValue::from_str(text)
        .map_err(|err| ParseError::invalid_format(text, "default is not a valid header value").with_source(err))?;
    request.headers_mut().insert(name, value);
    Ok(())
}

/// Swaps in the re-encoded body. Keeps the original bytes when the media
/// type has no encoder.
fn replace_body(
    request: &mut Request<Bytes>,
    value: &Value,
    content_type: &str,
    registry: &nomos_extract::BodyCodecRegistry,
) {
    let encoded = match registry.encode(value, content_type) {
        Ok(encoded) => encoded,
        Err(err) => {
            debug!(content_type, error = %err, "keeping original request body");
            return;
        }
    };
    if request.headers().contains_key(CONTENT_LENGTH) {
        request
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
    }
    *request.body_mut() = encoded;
}
