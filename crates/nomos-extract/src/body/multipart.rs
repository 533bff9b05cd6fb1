//! `multipart/form-data`.
//!
//! Every part is decoded on its own, by the decoder registered for its
//! `Content-Type` (from the part headers, else the property encoding, else
//! `text/plain`). `format: binary` parts become strings with one character
//! per byte (U+0000 to U+00FF), so no byte is lost and `minLength` and
//! `maxLength` count bytes. Parts named like an array property are collected
//! into that array.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use nomos_core::{AdditionalProperties, ParseError, ParseErrorKind, Schema, SchemaKind};
use nomos_schema::SchemaValidator;
use serde_json::{Map, Value};

use super::{BodyDecoder, DecodeInput};
use crate::param::primitive::parse_primitive;

/// Multipart decoder, built on `multer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartDecoder;

#[async_trait]
impl BodyDecoder for MultipartDecoder {
    async fn decode(&self, body: Bytes, input: DecodeInput<'_>) -> Result<Value, ParseError> {
        let boundary = multer::parse_boundary(input.content_type).map_err(|e| {
            ParseError::new(
                ParseErrorKind::InvalidFormat,
                "missing or invalid boundary in multipart Content-Type",
            )
            .with_source(e)
        })?;
        let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        let validator = SchemaValidator::default();
        let mut object = Map::new();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                return Err(ParseError::other("multipart part has no name"));
            };
            let part_type = field.content_type().map(ToString::to_string);
            let data = field.bytes().await.map_err(malformed)?;

            let property = input.schema.and_then(|schema| schema.property_schema(&name));
            let property = match property {
                Some(property) => Some(property),
                None if accepts_undeclared(input.schema) => None,
                None => {
                    return Err(ParseError::other(format!(
                        "part {name:?} is not defined in the schema"
                    ))
                    .at(name.as_str()))
                }
            };

            let is_array = property.is_some_and(|p| p.as_array().is_some());
            let item_schema = if is_array {
                property
                    .and_then(Schema::as_array)
                    .and_then(|array| array.items.as_deref())
            } else {
                property
            };
            let content_type = part_type
                .or_else(|| {
                    input
                        .property_encoding(&name)
                        .and_then(|encoding| encoding.content_type.clone())
                })
                .unwrap_or_else(|| "text/plain".to_string());

            let value = decode_part(data, &content_type, item_schema, input, &validator)
                .await
                .map_err(|e| e.at(name.as_str()))?;

            if is_array {
                if let Value::Array(items) = object
                    .entry(name)
                    .or_insert_with(|| Value::Array(Vec::new()))
                {
                    items.push(value);
                }
            } else {
                object.insert(name, value);
            }
        }
        Ok(Value::Object(object))
    }
}

fn malformed(e: multer::Error) -> ParseError {
    ParseError::new(ParseErrorKind::InvalidFormat, "malformed multipart body").with_source(e)
}

fn accepts_undeclared(schema: Option<&Schema>) -> bool {
    !schema
        .and_then(Schema::as_object)
        .is_some_and(|object| object.additional_properties == AdditionalProperties::Forbidden)
}

async fn decode_part(
    data: Bytes,
    content_type: &str,
    schema: Option<&Schema>,
    input: DecodeInput<'_>,
    validator: &SchemaValidator,
) -> Result<Value, ParseError> {
    if schema.is_some_and(Schema::is_binary) {
        return Ok(Value::String(data.iter().copied().map(char::from).collect()));
    }
    let value = input
        .registry
        .decode(data, DecodeInput::new(content_type, input.registry).schema(schema))
        .await?;
    match (value, schema) {
        (Value::String(text), Some(schema))
            if matches!(schema.kind, SchemaKind::Primitive(_) | SchemaKind::Any) =>
        {
            Ok(parse_primitive(&text, schema, validator)?.unwrap_or(Value::String(text)))
        }
        (value, _) => Ok(value),
    }
}
