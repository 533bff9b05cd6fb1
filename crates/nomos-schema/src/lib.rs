//! # Nomos Schema
//!
//! Validates decoded values against resolved OpenAPI schemas.
//!
//! The validator checks types, formats, ranges and lengths, walks
//! `allOf`/`anyOf`/`oneOf`/`not` compositions (honouring discriminators),
//! enforces `readOnly`/`writeOnly` by [`Direction`] and writes `default`
//! values into the value tree.
//!
//! ```text
//!   Value ──▶ SchemaValidator::validate(schema) ──▶ Ok(()) + defaults written
//!                      │
//!                      └──▶ SchemaViolation::{Single, Multi}
//!                                 └── SchemaError { schema_field, reason, path, origin }
//! ```
//!
//! Failures stop at the first error unless
//! [`ValidationOptions::multi_error`] is set.
//!
//! # Example
//!
//! ```
//! use nomos_core::Schema;
//! use nomos_schema::{validate, ValidationOptions};
//!
//! let schema = Schema::integer().format("int32");
//! let mut value: serde_json::Value = serde_json::from_str("2147483648").unwrap();
//!
//! let violation = validate(&schema, &mut value, &ValidationOptions::default()).unwrap_err();
//! assert_eq!(violation.first().unwrap().reason, "number must be an int32");
//! ```

#![doc(html_root_url = "https://docs.rs/nomos-schema/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compare;
pub mod format;
mod options;
mod validator;

pub use options::{Direction, ErrorFormatter, UniqueItemsChecker, ValidationOptions};
pub use validator::SchemaValidator;

use nomos_core::{Schema, SchemaViolation};
use serde_json::Value;

/// Validates `value` against `schema` with the given options.
///
/// Shorthand for `SchemaValidator::new(options.clone()).validate(schema, value)`.
pub fn validate(
    schema: &Schema,
    value: &mut Value,
    options: &ValidationOptions,
) -> Result<(), SchemaViolation> {
    SchemaValidator::new(options.clone()).validate(schema, value)
}
