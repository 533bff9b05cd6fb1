//! # Nomos Sentinel
//!
//! Validates HTTP requests and responses against the operation a router
//! matched them to.
//!
//! # Overview
//!
//! A request goes through three stages, in order:
//!
//! 1. **Parameters**: path-item parameters, overridden by operation
//!    parameters with the same name and location, are decoded by the
//!    parameter codec and validated against their schemas. Absent optional
//!    parameters with a default get the default written into the request.
//! 2. **Request body**: decoded by the codec registered for its
//!    `Content-Type` and validated in request direction (`readOnly`
//!    properties rejected). When validation writes defaults the body is
//!    replaced by its re-encoded form.
//! 3. **Security**: the first requirement alternative whose schemes all
//!    pass the [`Authenticator`] wins.
//!
//! Validation stops at the first failure unless [`Options::multi_error`] is
//! set, in which case every failure is returned as
//! [`ValidationError::Multi`].
//!
//! ```text
//!   Route + Request ──▶ Sentinel::validate_request
//!                          ├── parameters ──▶ ParameterCodec ──▶ SchemaValidator
//!                          ├── body ───────▶ BodyCodecRegistry ──▶ SchemaValidator
//!                          └── security ───▶ Authenticator
//!
//!   Route + Response ─▶ Sentinel::validate_response
//!                          ├── status (documented, or `default`)
//!                          ├── headers ────▶ ParameterCodec ──▶ SchemaValidator
//!                          └── body ───────▶ BodyCodecRegistry ──▶ SchemaValidator
//! ```
//!
//! `HEAD` requests and the statuses 301, 304, 307 and 308 always pass
//! response validation.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::{Method, Request};
//! use nomos_core::fixtures;
//! use nomos_sentinel::{Options, RequestValidationInput, Sentinel};
//!
//! # tokio_test::block_on(async {
//! let route = fixtures::route(&Method::POST, "/numbers").unwrap();
//! let sentinel = Sentinel::builder().options(Options::new()).build();
//!
//! let mut request = Request::post("/numbers")
//!     .header("content-type", "application/json")
//!     .body(Bytes::from_static(br#"{"testInteger": 9223372036854775807}"#))
//!     .unwrap();
//!
//! let mut input = RequestValidationInput::new(&mut request, &route);
//! assert!(sentinel.validate_request(&mut input).await.is_ok());
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/nomos-sentinel/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
mod input;
mod options;
mod request;
mod response;
pub mod security;

use std::fmt;
use std::sync::Arc;

use nomos_extract::{BodyCodecRegistry, ParameterCodec};
use nomos_schema::SchemaValidator;
use nomos_telemetry::metrics::{record_validation_failure, Outcome};
use tracing::warn;

pub use error::{
    AuthenticationError, RequestError, RequestErrorCause, RequestTarget, ResponseError,
    ResponseErrorCause, ResponseTarget, SecurityRequirementsError, ValidationError,
    ValidationResult,
};
pub use input::{RequestValidationInput, ResponseValidationInput};
pub use options::{EndpointType, Options};
pub use security::{AuthenticationInput, Authenticator};

/// The validation orchestrator.
///
/// A sentinel is immutable once built and can be shared across tasks.
pub struct Sentinel {
    options: Options,
    registry: Arc<BodyCodecRegistry>,
    authenticator: Option<Arc<dyn Authenticator>>,
    codec: ParameterCodec,
    request_validator: SchemaValidator,
    response_validator: SchemaValidator,
}

impl fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sentinel")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Sentinel {
    /// Starts a builder.
    pub fn builder() -> SentinelBuilder {
        SentinelBuilder::default()
    }

    /// A sentinel with default options, the global codec registry and no
    /// authenticator.
    pub fn new() -> Self {
        Self::default()
    }

    /// The options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The body codec registry.
    pub fn registry(&self) -> &Arc<BodyCodecRegistry> {
        &self.registry
    }
}

/// Builder for [`Sentinel`].
#[derive(Default)]
pub struct SentinelBuilder {
    options: Options,
    registry: Option<Arc<BodyCodecRegistry>>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl fmt::Debug for SentinelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentinelBuilder")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("authenticator", &self.authenticator.is_some())
            .finish()
    }
}

impl SentinelBuilder {
    /// Sets the options.
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Uses `registry` instead of [`BodyCodecRegistry::global`].
    #[must_use]
    pub fn registry(mut self, registry: Arc<BodyCodecRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the authenticator for security requirements.
    #[must_use]
    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Builds the sentinel.
    pub fn build(self) -> Sentinel {
        let request_validator = SchemaValidator::new(self.options.request_schema_options());
        let response_validator = SchemaValidator::new(self.options.response_schema_options());
        Sentinel {
            registry: self.registry.unwrap_or_else(BodyCodecRegistry::global),
            authenticator: self.authenticator,
            codec: ParameterCodec::new(),
            request_validator,
            response_validator,
            options: self.options,
        }
    }
}

/// Failures collected across stages.
///
/// Fail-fast hands the first failure straight back; in multi-error mode
/// failures are kept in stage order. Document errors always stop.
pub(crate) struct Failures {
    multi: bool,
    operation: String,
    errors: Vec<ValidationError>,
}

impl Failures {
    pub(crate) fn new(multi: bool, operation: String) -> Self {
        Self {
            multi,
            operation,
            errors: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, result: ValidationResult, stage: &'static str) -> ValidationResult {
        let Err(error) = result else {
            return Ok(());
        };
        record_validation_failure(stage);
        warn!(operation = %self.operation, stage, error = %error, "validation failed");
        if !self.multi || matches!(error, ValidationError::Document(_)) {
            return Err(error);
        }
        self.errors.push(error);
        Ok(())
    }

    pub(crate) fn finish(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Multi(self.errors.into()))
        }
    }
}

pub(crate) fn outcome(result: &ValidationResult) -> Outcome {
    if result.is_ok() {
        Outcome::Valid
    } else {
        Outcome::Invalid
    }
}
