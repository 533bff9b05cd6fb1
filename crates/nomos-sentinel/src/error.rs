//! Sentinel error types.
//!
//! ```text
//!   ValidationError
//!     ├── Request(RequestError)        parameter or request body
//!     ├── Response(ResponseError)      status, header or response body
//!     ├── Security(SecurityRequirementsError)
//!     ├── Multi(MultiError<ValidationError>)
//!     └── Document(DocumentError)      malformed document, not user input
//! ```
//!
//! Every variant keeps the underlying [`ParseError`] or [`SchemaViolation`]
//! so callers can build precise responses (kind, path, allowed values).

use std::fmt;

use nomos_core::{DocumentError, Location, MultiError, ParseError, SchemaViolation, SecurityRequirement};
use thiserror::Error;

/// Result type for sentinel validations.
pub type ValidationResult = Result<(), ValidationError>;

/// Top-level validation failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A request parameter or the request body is invalid.
    #[error(transparent)]
    Request(Box<RequestError>),

    /// The response does not match the document.
    #[error(transparent)]
    Response(Box<ResponseError>),

    /// No security requirement alternative was satisfied.
    #[error(transparent)]
    Security(SecurityRequirementsError),

    /// Every failure, in stage order. Only produced in multi-error mode.
    #[error(transparent)]
    Multi(MultiError<ValidationError>),

    /// The document is inconsistent.
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),
}

impl ValidationError {
    /// The request error, if this is one.
    pub fn as_request(&self) -> Option<&RequestError> {
        match self {
            Self::Request(error) => Some(error),
            _ => None,
        }
    }

    /// The response error, if this is one.
    pub fn as_response(&self) -> Option<&ResponseError> {
        match self {
            Self::Response(error) => Some(error),
            _ => None,
        }
    }

    /// Flattens multi-errors into their members.
    pub fn errors(&self) -> Vec<&ValidationError> {
        match self {
            Self::Multi(errors) => errors.iter().flat_map(ValidationError::errors).collect(),
            other => vec![other],
        }
    }
}

impl From<RequestError> for ValidationError {
    fn from(error: RequestError) -> Self {
        Self::Request(Box::new(error))
    }
}

impl From<ResponseError> for ValidationError {
    fn from(error: ResponseError) -> Self {
        Self::Response(Box::new(error))
    }
}

impl From<SecurityRequirementsError> for ValidationError {
    fn from(error: SecurityRequirementsError) -> Self {
        Self::Security(error)
    }
}

/// What part of a request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    /// A parameter.
    Parameter {
        /// Parameter name.
        name: String,
        /// Parameter location.
        location: Location,
    },
    /// The request body.
    Body,
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter { name, location } => write!(f, "parameter {name:?} in {location}"),
            Self::Body => f.write_str("request body"),
        }
    }
}

/// Why a request part failed.
#[derive(Debug, Error)]
pub enum RequestErrorCause {
    /// A required value is missing.
    #[error("value is required but missing")]
    Required,

    /// An empty value was sent for a parameter that does not allow one.
    #[error("empty value is not allowed")]
    EmptyValue,

    /// The request has no `Content-Type` header.
    #[error("header Content-Type is missing")]
    MissingContentType,

    /// The `Content-Type` is not declared for the request body.
    #[error("header Content-Type has unexpected value: {0:?}")]
    UnexpectedContentType(String),

    /// A body was sent to an operation that declares none.
    #[error("operation does not declare a request body")]
    BodyNotSpecified,

    /// The raw value could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The decoded value does not match its schema.
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
}

/// A parameter or request body failure.
#[derive(Debug, Error)]
pub struct RequestError {
    /// The failing part.
    pub target: RequestTarget,
    /// The failure.
    #[source]
    pub cause: RequestErrorCause,
    /// A corrected query string, when the value looks mis-serialized.
    pub hint: Option<String>,
}

impl RequestError {
    /// A failure of `parameter`.
    pub fn parameter(name: impl Into<String>, location: Location, cause: impl Into<RequestErrorCause>) -> Self {
        Self {
            target: RequestTarget::Parameter {
                name: name.into(),
                location,
            },
            cause: cause.into(),
            hint: None,
        }
    }

    /// A failure of the request body.
    pub fn body(cause: impl Into<RequestErrorCause>) -> Self {
        Self {
            target: RequestTarget::Body,
            cause: cause.into(),
            hint: None,
        }
    }

    /// Attaches a corrected query string.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Whether a required value was missing.
    pub fn is_required(&self) -> bool {
        matches!(self.cause, RequestErrorCause::Required)
    }

    /// The parse error, if decoding failed.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match &self.cause {
            RequestErrorCause::Parse(error) => Some(error),
            _ => None,
        }
    }

    /// The schema violation, if the value did not match.
    pub fn schema_violation(&self) -> Option<&SchemaViolation> {
        match &self.cause {
            RequestErrorCause::Schema(violation) => Some(violation),
            _ => None,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has an error: {}", self.target, self.cause)?;
        if let Some(hint) = &self.hint {
            write!(f, " (did you mean {hint:?}?)")?;
        }
        Ok(())
    }
}

/// What part of a response failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseTarget {
    /// The status code.
    Status,
    /// A declared header.
    Header(String),
    /// The response body.
    Body,
}

impl fmt::Display for ResponseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status => f.write_str("response status"),
            Self::Header(name) => write!(f, "response header {name:?}"),
            Self::Body => f.write_str("response body"),
        }
    }
}

/// Why a response part failed.
#[derive(Debug, Error)]
pub enum ResponseErrorCause {
    /// The status is not documented for the operation.
    #[error("status is not documented")]
    UndocumentedStatus,

    /// A required header is missing.
    #[error("value is required but missing")]
    Required,

    /// The response has no `Content-Type` header.
    #[error("header Content-Type is missing")]
    MissingContentType,

    /// The `Content-Type` is not declared for the status.
    #[error("header Content-Type has unexpected value: {0:?}")]
    UnexpectedContentType(String),

    /// The raw value could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The decoded value does not match its schema.
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
}

/// A response failure.
#[derive(Debug, Error)]
#[error("{target} has an error (status {status}): {cause}")]
pub struct ResponseError {
    /// The failing part.
    pub target: ResponseTarget,
    /// Response status.
    pub status: u16,
    /// The failure.
    #[source]
    pub cause: ResponseErrorCause,
}

impl ResponseError {
    /// Creates a response error.
    pub fn new(target: ResponseTarget, status: u16, cause: impl Into<ResponseErrorCause>) -> Self {
        Self {
            target,
            status,
            cause: cause.into(),
        }
    }

    /// The schema violation, if the value did not match.
    pub fn schema_violation(&self) -> Option<&SchemaViolation> {
        match &self.cause {
            ResponseErrorCause::Schema(violation) => Some(violation),
            _ => None,
        }
    }
}

/// Why one security scheme was not satisfied.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// A requirement names schemes but no authenticator is configured.
    #[error("no authenticator is configured")]
    NoAuthenticator,

    /// The authenticator rejected the credentials.
    #[error("security scheme {scheme:?} rejected the request: {reason}")]
    Rejected {
        /// Scheme name.
        scheme: String,
        /// Reason given by the authenticator.
        reason: String,
    },

    /// Any other authenticator failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuthenticationError {
    /// A rejection of `scheme`.
    pub fn rejected(scheme: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            scheme: scheme.into(),
            reason: reason.into(),
        }
    }
}

/// Every requirement alternative failed.
#[derive(Debug, Error)]
pub struct SecurityRequirementsError {
    /// The alternatives, in document order.
    pub requirements: Vec<SecurityRequirement>,
    /// One failure per alternative, in the same order.
    pub errors: Vec<AuthenticationError>,
}

impl fmt::Display for SecurityRequirementsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("security requirements failed: ")?;
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = RequestError::parameter("limit", Location::Query, RequestErrorCause::Required);
        assert_eq!(
            err.to_string(),
            "parameter \"limit\" in query has an error: value is required but missing"
        );
        assert!(err.is_required());

        let err = RequestError::body(ParseError::invalid_format("{", "invalid JSON body"));
        assert_eq!(
            err.to_string(),
            "request body has an error: value {: invalid JSON body"
        );
        assert!(err.parse_error().is_some());
    }

    #[test]
    fn test_hint_is_appended() {
        let err = RequestError::parameter("status", Location::Query, RequestErrorCause::EmptyValue)
            .with_hint("?status=a&status=b");
        assert!(err
            .to_string()
            .ends_with("(did you mean \"?status=a&status=b\"?)"));
    }

    #[test]
    fn test_response_error_display() {
        let err = ResponseError::new(
            ResponseTarget::Header("X-Rate-Limit".into()),
            200,
            ResponseErrorCause::Required,
        );
        assert_eq!(
            err.to_string(),
            "response header \"X-Rate-Limit\" has an error (status 200): value is required but missing"
        );
    }

    #[test]
    fn test_security_error_joins_causes() {
        let err = SecurityRequirementsError {
            requirements: vec![],
            errors: vec![
                AuthenticationError::NoAuthenticator,
                AuthenticationError::rejected("bearer", "expired token"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "security requirements failed: no authenticator is configured | security scheme \"bearer\" rejected the request: expired token"
        );
    }

    #[test]
    fn test_errors_flatten() {
        let multi: MultiError<ValidationError> = vec![
            ValidationError::from(RequestError::body(RequestErrorCause::Required)),
            ValidationError::Multi(
                vec![ValidationError::from(DocumentError::UndeclaredSecurityScheme(
                    "x".into(),
                ))]
                .into(),
            ),
        ]
        .into();
        let err = ValidationError::Multi(multi);
        assert_eq!(err.errors().len(), 2);
        assert!(err.errors()[0].as_request().is_some());
    }
}
