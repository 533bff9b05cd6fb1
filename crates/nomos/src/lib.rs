//! # Nomos
//!
//! **OpenAPI 3 request and response validation**
//!
//! Nomos checks HTTP messages against a resolved OpenAPI document:
//!
//! - **Parameters** – path, query, header and cookie values decoded per
//!   style and explode, including `deepObject`, then schema-checked
//! - **Bodies** – JSON, YAML, form-urlencoded, multipart and text, through
//!   an extensible codec registry
//! - **Schemas** – types, formats, ranges, composition, discriminators and
//!   `readOnly`/`writeOnly` per direction
//! - **Security** – requirement alternatives checked by a host-supplied
//!   authenticator
//! - **Responses** – status, declared headers and body
//!
//! Nomos does not load documents or match paths. A loader produces the
//! [`Document`](core::Document) and a router produces the
//! [`Route`](core::Route) for each request.
//!
//! ## Quick Start
//!
//! ```
//! use bytes::Bytes;
//! use http::Method;
//! use nomos::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let route = nomos::core::fixtures::route(&Method::GET, "/pets/{petId}")
//!     .unwrap()
//!     .path_param("petId", "42");
//! let sentinel = Sentinel::builder()
//!     .options(Options::new().multi_error(true))
//!     .build();
//!
//! let mut request = http::Request::get("/pets/42").body(Bytes::new()).unwrap();
//! let mut input = RequestValidationInput::new(&mut request, &route);
//! sentinel.validate_request(&mut input).await.unwrap();
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request ─▶ parameters ─▶ body ─▶ security ─▶ (handler)
//!              │             │
//!        ParameterCodec  BodyCodecRegistry
//!              └──────┬──────┘
//!               SchemaValidator
//!
//! Response ◀─ body ◀─ headers ◀─ status ◀──────┘
//! ```

#![doc(html_root_url = "https://docs.rs/nomos/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export the document model
pub use nomos_core as core;

// Re-export the schema validator
pub use nomos_schema as schema;

// Re-export parameter and body codecs
pub use nomos_extract as extract;

// Re-export the orchestrator
pub use nomos_sentinel as sentinel;

// Re-export configuration
pub use nomos_config as config;

// Re-export logging and metrics
pub use nomos_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use nomos::prelude::*;
///
/// let sentinel = Sentinel::builder().options(Options::new()).build();
/// assert!(!sentinel.options().multi_error);
/// ```
pub mod prelude {
    pub use nomos_core::{
        Document, DocumentError, Location, Operation, Parameter, ParseError, ParseErrorKind,
        Route, Schema, SchemaError, SchemaViolation, SecurityRequirement, SecurityScheme,
    };
    // Schema validation
    pub use nomos_schema::{Direction, SchemaValidator, ValidationOptions};
    // Codecs
    pub use nomos_extract::{BodyCodecRegistry, BodyDecoder, BodyEncoder, DecodeInput};
    // Orchestrator
    pub use nomos_sentinel::{
        AuthenticationError, AuthenticationInput, Authenticator, EndpointType, Options,
        RequestError, RequestValidationInput, ResponseError, ResponseValidationInput, Sentinel,
        ValidationError, ValidationResult,
    };
    // Configuration
    pub use nomos_config::{ConfigLoader, NomosConfig};
}
