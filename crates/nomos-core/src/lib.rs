//! # Nomos Core
//!
//! Resolved OpenAPI 3 document model and the error taxonomy shared by every
//! nomos crate.
//!
//! The document tree is produced once by an external loader (which parses
//! YAML/JSON and resolves `$ref`s) and is read-only afterwards. It can be
//! shared across concurrently validated transactions without locking.
//!
//! - [`Schema`] - recursive schema node with a closed [`SchemaKind`] shape
//! - [`Parameter`] - a parameter whose (location, style, explode) combination
//!   was checked at construction
//! - [`Operation`], [`PathItem`], [`RequestBody`], [`Response`], [`Content`]
//! - [`Document`] and [`Route`] - the resolved input handed over by a router
//! - [`ParseError`], [`SchemaError`], [`SchemaViolation`], [`MultiError`],
//!   [`DocumentError`] - the error taxonomy
//!
//! # Example
//!
//! ```
//! use nomos_core::{Schema, SchemaKind};
//! use serde_json::json;
//!
//! let schema: Schema = serde_json::from_value(json!({
//!     "type": "object",
//!     "required": ["name"],
//!     "properties": {
//!         "name": { "type": "string", "minLength": 1 },
//!         "tag": { "type": "string", "default": "none" }
//!     }
//! }))
//! .unwrap();
//!
//! assert!(matches!(schema.kind, SchemaKind::Object(_)));
//! assert_eq!(schema.property_schema("tag").and_then(|s| s.default.clone()), Some(json!("none")));
//! ```

#![doc(html_root_url = "https://docs.rs/nomos-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod document;
mod error;
pub mod fixtures;
pub mod parameter;
mod route;
pub mod schema;
pub mod security;
mod violation;

pub use document::{
    Content, Document, DocumentBuilder, Encoding, MediaType, Operation, OperationBuilder,
    PathItem, RequestBody, Response, Responses, Server,
};
pub use error::{DocumentError, MultiError, ParseError, ParseErrorKind, PathSegment};
pub use parameter::{
    Location, Parameter, ParameterBuilder, ParameterValue, SerializationMethod, Shape, Style,
};
pub use route::Route;
pub use schema::{
    AdditionalProperties, ArraySchema, Bound, Composition, Discriminator, NumberConstraints,
    ObjectSchema, Pattern, Primitive, Schema, SchemaKind, StringConstraints,
};
pub use security::{ApiKeyLocation, SecurityRequirement, SecurityScheme};
pub use violation::{SchemaError, SchemaViolation};
