//! Parameter decoding.
//!
//! [`ParameterCodec::decode`] dispatches on location and on the shape of
//! the parameter's schema:
//!
//! ```text
//! Parameter ──▶ content? ──yes──▶ content::decode
//!                  │
//!                  no
//!                  ▼
//!        Shape::of(schema)
//!          ├── Primitive ──▶ decoder.decode_primitive
//!          ├── Array     ──▶ decoder.decode_array
//!          ├── Object    ──▶ decoder.decode_object
//!          └── Composite ──▶ decode each branch, pick one
//! ```
//!
//! The decoder is chosen by location: path, query, header or cookie.

mod content;
pub(crate) mod deep_object;
pub mod encode;
mod location;
pub(crate) mod primitive;

use nomos_core::{Location, Parameter, ParameterValue, SerializationMethod, Schema, Shape};
use nomos_schema::SchemaValidator;
use serde_json::Value;
use tracing::trace;

use crate::context::ParameterContext;
use crate::error::DecodeError;
use location::{CookieDecoder, HeaderDecoder, PathDecoder, QueryDecoder, ValueDecoder};

/// Outcome of decoding one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The parameter is not in the request.
    Absent,
    /// The parameter is present without a value, like `?flag=`.
    Empty,
    /// The decoded value.
    Value(Value),
}

impl Decoded {
    /// `Empty` for `None`, `Value` otherwise.
    pub(crate) fn present(value: Option<Value>) -> Self {
        value.map_or(Self::Empty, Self::Value)
    }

    /// Whether the parameter appeared in the request.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// The decoded value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes `self`, returning the decoded value, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Decodes parameters from their raw request form.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use http::{HeaderMap, Uri};
/// use nomos_core::{Location, Parameter, Schema, Style};
/// use nomos_extract::{Decoded, ParameterCodec, ParameterContext};
///
/// let tags = Parameter::builder("tags", Location::Path)
///     .schema(Schema::array(Schema::string()))
///     .style(Style::Label, false)
///     .build()
///     .unwrap();
///
/// let path_params = HashMap::from([("tags".to_string(), ".foo,bar".to_string())]);
/// let uri = Uri::from_static("/tags/.foo,bar");
/// let headers = HeaderMap::new();
/// let ctx = ParameterContext::new(&path_params, &uri, &headers).unwrap();
///
/// let decoded = ParameterCodec::new().decode(&tags, &ctx).unwrap();
/// assert_eq!(decoded, Decoded::Value(serde_json::json!(["foo", "bar"])));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParameterCodec {
    validator: SchemaValidator,
}

impl ParameterCodec {
    /// Creates a codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec that uses `validator` to choose composition branches.
    pub fn with_validator(validator: SchemaValidator) -> Self {
        Self { validator }
    }

    /// Decodes `parameter` from the request.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Parse`] when the raw value is malformed and
    /// [`DecodeError::Document`] when the parameter's serialization cannot
    /// be decoded at its location.
    pub fn decode(
        &self,
        parameter: &Parameter,
        ctx: &ParameterContext<'_>,
    ) -> Result<Decoded, DecodeError> {
        trace!(parameter = %parameter.name, location = %parameter.location, "decoding parameter");
        match &parameter.value {
            ParameterValue::Content { media_type, schema } => {
                content::decode(parameter, media_type, schema.as_ref(), ctx)
            }
            ParameterValue::Schema { schema, method } => {
                let validator = &self.validator;
                match parameter.location {
                    Location::Path => {
                        decode_value(&PathDecoder { ctx, validator }, parameter, *method, schema)
                    }
                    Location::Query => {
                        decode_value(&QueryDecoder { ctx, validator }, parameter, *method, schema)
                    }
                    Location::Header => {
                        decode_value(&HeaderDecoder { ctx, validator }, parameter, *method, schema)
                    }
                    Location::Cookie => {
                        decode_value(&CookieDecoder { ctx, validator }, parameter, *method, schema)
                    }
                }
            }
        }
    }
}

fn decode_value(
    decoder: &dyn ValueDecoder,
    param: &Parameter,
    method: SerializationMethod,
    schema: &Schema,
) -> Result<Decoded, DecodeError> {
    match Shape::of(schema) {
        Shape::Primitive => decoder.decode_primitive(param, method, schema),
        Shape::Array => decoder.decode_array(param, method, schema),
        Shape::Object => decoder.decode_object(param, method, schema),
        Shape::Composite if !schema.composition.all_of.is_empty() => {
            decode_all_of(decoder, param, method, schema)
        }
        Shape::Composite => decode_either(decoder, param, method, schema),
    }
}

/// Every `allOf` branch must decode; objects are merged, anything else is
/// taken from the last branch.
fn decode_all_of(
    decoder: &dyn ValueDecoder,
    param: &Parameter,
    method: SerializationMethod,
    schema: &Schema,
) -> Result<Decoded, DecodeError> {
    let mut merged = Decoded::Absent;
    for branch in &schema.composition.all_of {
        let decoded = decode_value(decoder, param, method, branch)?;
        merged = match (merged, decoded) {
            (Decoded::Value(Value::Object(mut into)), Decoded::Value(Value::Object(from))) => {
                into.extend(from);
                Decoded::Value(Value::Object(into))
            }
            (previous, Decoded::Absent) => previous,
            (_, decoded) => decoded,
        };
    }
    Ok(merged)
}

/// `oneOf`/`anyOf`: the first branch whose decoded value it also accepts,
/// else the first branch that decodes at all.
fn decode_either(
    decoder: &dyn ValueDecoder,
    param: &Parameter,
    method: SerializationMethod,
    schema: &Schema,
) -> Result<Decoded, DecodeError> {
    let composition = &schema.composition;
    let branches: Vec<&Schema> = composition.one_of.iter().chain(&composition.any_of).collect();
    if branches.is_empty() {
        return decoder.decode_primitive(param, method, schema);
    }

    let mut fallback: Option<Value> = None;
    let mut empty = false;
    let mut first_error: Option<DecodeError> = None;
    for branch in branches {
        match decode_value(decoder, param, method, branch) {
            Ok(Decoded::Value(value)) => {
                if decoder.validator().check(branch, &value).is_ok() {
                    return Ok(Decoded::Value(value));
                }
                fallback.get_or_insert(value);
            }
            Ok(Decoded::Empty) => empty = true,
            Ok(Decoded::Absent) => {}
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    match (fallback, first_error) {
        (Some(value), _) => Ok(Decoded::Value(value)),
        (None, _) if empty => Ok(Decoded::Empty),
        (None, Some(err)) => Err(err),
        (None, None) => Ok(Decoded::Absent),
    }
}
