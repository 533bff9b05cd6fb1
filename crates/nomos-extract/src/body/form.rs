//! `application/x-www-form-urlencoded`.
//!
//! Fields are decoded per declared property, with the property's encoding
//! (style and explode, `form`/`true` by default) deciding how arrays and
//! objects are spread over the pairs. Undeclared fields are kept as strings.

use std::collections::HashSet;

use async_trait::async_trait;
use bytes::Bytes;
use nomos_core::{Encoding, ParseError, Schema, SerializationMethod, Shape, Style};
use nomos_schema::SchemaValidator;
use serde_json::{Map, Value};

use super::{BodyDecoder, BodyEncoder, DecodeInput};
use crate::param::deep_object;
use crate::param::encode::{deep_pairs, scalar_text};
use crate::param::primitive::{
    make_object, parse_array, parse_primitive, property_names, props_from_string,
};
use crate::param::Decoded;

/// Form decoder and encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

#[async_trait]
impl BodyDecoder for FormCodec {
    async fn decode(&self, body: Bytes, input: DecodeInput<'_>) -> Result<Value, ParseError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body)
            .map_err(|e| ParseError::invalid_format(String::from_utf8_lossy(&body), "invalid form body").with_source(e))?;
        decode_pairs(&pairs, input)
    }
}

impl BodyEncoder for FormCodec {
    fn encode(&self, value: &Value, _content_type: &str) -> Result<Bytes, ParseError> {
        let Value::Object(map) = value else {
            return Err(ParseError::other("a form body must be an object"));
        };
        let mut pairs = Vec::new();
        for (key, item) in map {
            match item {
                Value::Array(items) => {
                    pairs.extend(items.iter().map(|item| (key.clone(), scalar_text(item))));
                }
                Value::Object(_) => deep_pairs(key, item, &mut pairs),
                scalar => pairs.push((key.clone(), scalar_text(scalar))),
            }
        }
        serde_urlencoded::to_string(&pairs)
            .map(Bytes::from)
            .map_err(|e| ParseError::other("cannot encode form body").with_source(e))
    }
}

fn values<'p>(pairs: &'p [(String, String)], name: &str) -> Vec<&'p str> {
    pairs
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .collect()
}

fn decode_pairs(pairs: &[(String, String)], input: DecodeInput<'_>) -> Result<Value, ParseError> {
    let mut object = Map::new();
    let mut consumed: HashSet<String> = HashSet::new();

    if let Some(schema) = input.schema {
        let validator = SchemaValidator::default();
        for name in property_names(schema) {
            let Some(property) = schema.property_schema(name) else {
                continue;
            };
            let method = input
                .property_encoding(name)
                .map_or_else(SerializationMethod::form, Encoding::serialization_method);
            let decoded = decode_property(pairs, name, property, method, &validator, &mut consumed)
                .map_err(|e| e.at(name))?;
            if let Some(value) = decoded {
                object.insert(name.to_string(), value);
            }
        }
    }

    for (key, value) in pairs {
        if !consumed.contains(key) && !object.contains_key(key) {
            object.insert(key.clone(), Value::String(value.clone()));
        }
    }
    Ok(Value::Object(object))
}

fn decode_property(
    pairs: &[(String, String)],
    name: &str,
    property: &Schema,
    method: SerializationMethod,
    validator: &SchemaValidator,
    consumed: &mut HashSet<String>,
) -> Result<Option<Value>, ParseError> {
    let found = values(pairs, name);
    match Shape::of(property) {
        Shape::Array => {
            let Some(first) = found.first() else {
                return Ok(None);
            };
            consumed.insert(name.to_string());
            let items: Vec<String> = match (method.style, method.explode) {
                (Style::Form, true) => found.iter().map(|v| (*v).to_string()).collect(),
                (Style::SpaceDelimited, _) => first.split(' ').map(str::to_string).collect(),
                (Style::PipeDelimited, _) => first.split('|').map(str::to_string).collect(),
                _ => first.split(',').map(str::to_string).collect(),
            };
            parse_array(&items, property, validator)
        }
        Shape::Object if method.style == Style::DeepObject => {
            let prefix = format!("{name}[");
            consumed.extend(
                pairs
                    .iter()
                    .filter(|(key, _)| key.starts_with(&prefix))
                    .map(|(key, _)| key.clone()),
            );
            match deep_object::decode(name, pairs, property, validator)? {
                Decoded::Value(value) => Ok(Some(value)),
                Decoded::Empty | Decoded::Absent => Ok(None),
            }
        }
        Shape::Object if method.explode => {
            let props: Vec<(String, String)> = property_names(property)
                .into_iter()
                .filter_map(|key| {
                    let found = values(pairs, key);
                    (!found.is_empty()).then(|| (key.to_string(), found.join(",")))
                })
                .collect();
            if props.is_empty() {
                return Ok(None);
            }
            consumed.extend(props.iter().map(|(key, _)| key.clone()));
            make_object(props, property, validator).map(Some)
        }
        Shape::Object => {
            let Some(first) = found.first() else {
                return Ok(None);
            };
            consumed.insert(name.to_string());
            if first.is_empty() {
                return Ok(None);
            }
            let props = props_from_string(first, ',', ',')?;
            make_object(props, property, validator).map(Some)
        }
        Shape::Primitive | Shape::Composite => {
            let Some(first) = found.first() else {
                return Ok(None);
            };
            consumed.insert(name.to_string());
            Ok(Some(
                parse_primitive(first, property, validator)?
                    .unwrap_or_else(|| Value::String(String::new())),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyCodecRegistry;
    use indexmap::IndexMap;
    use nomos_core::AdditionalProperties;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::object()
            .property("title", Schema::string())
            .property("ids", Schema::array(Schema::integer()))
            .property("count", Schema::integer())
    }

    async fn decode(body: &'static str, schema: &Schema, encoding: &IndexMap<String, Encoding>) -> Result<Value, ParseError> {
        let registry = BodyCodecRegistry::empty();
        let input = DecodeInput::new("application/x-www-form-urlencoded", &registry)
            .schema(Some(schema))
            .encoding(encoding);
        FormCodec.decode(Bytes::from_static(body.as_bytes()), input).await
    }

    #[tokio::test]
    async fn test_declared_and_undeclared_fields() {
        let value = decode("title=Rex+the+dog&ids=1&ids=2&count=3&extra=x", &schema(), &IndexMap::new())
            .await
            .unwrap();
        assert_eq!(
            value,
            json!({"title": "Rex the dog", "ids": [1, 2], "count": 3, "extra": "x"})
        );
    }

    #[tokio::test]
    async fn test_encoding_override() {
        let encoding = IndexMap::from([(
            "ids".to_string(),
            Encoding {
                style: Some(Style::PipeDelimited),
                explode: Some(false),
                ..Encoding::default()
            },
        )]);
        let value = decode("ids=1%7C2%7C3", &schema(), &encoding).await.unwrap();
        assert_eq!(value, json!({"ids": [1, 2, 3]}));
    }

    #[tokio::test]
    async fn test_deep_object_property() {
        let schema = Schema::object().property(
            "filter",
            Schema::object().property("size", Schema::integer()),
        );
        let encoding = IndexMap::from([(
            "filter".to_string(),
            Encoding {
                style: Some(Style::DeepObject),
                explode: Some(true),
                ..Encoding::default()
            },
        )]);
        let value = decode("filter%5Bsize%5D=2", &schema, &encoding).await.unwrap();
        assert_eq!(value, json!({"filter": {"size": 2}}));
    }

    #[tokio::test]
    async fn test_invalid_field_reports_path() {
        let err = decode("count=many", &schema(), &IndexMap::new()).await.unwrap_err();
        assert_eq!(err.path(), &[nomos_core::PathSegment::from("count")]);
    }

    #[tokio::test]
    async fn test_undeclared_fields_reach_validation() {
        let strict = schema().additional_properties(AdditionalProperties::Forbidden);
        let value = decode("title=a&unknown=1", &strict, &IndexMap::new()).await.unwrap();
        assert_eq!(value["unknown"], "1");
    }

    #[test]
    fn test_encode() {
        let body = FormCodec
            .encode(&json!({"title": "a b", "ids": [1, 2], "f": {"x": 1}}), "application/x-www-form-urlencoded")
            .unwrap();
        assert_eq!(body, Bytes::from_static(b"title=a+b&ids=1&ids=2&f%5Bx%5D=1"));
    }
}
