//! `application/yaml` and `application/x-yaml`.

use async_trait::async_trait;
use bytes::Bytes;
use nomos_core::{ParseError, ParseErrorKind};
use nomos_schema::compare::{integer_value, is_integer};
use serde_json::{Number, Value};

use super::{BodyDecoder, BodyEncoder, DecodeInput};

/// YAML decoder and encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

#[async_trait]
impl BodyDecoder for YamlCodec {
    async fn decode(&self, body: Bytes, _input: DecodeInput<'_>) -> Result<Value, ParseError> {
        serde_yaml::from_slice(&body).map_err(|e| {
            ParseError::new(ParseErrorKind::InvalidFormat, "invalid YAML body").with_source(e)
        })
    }
}

impl BodyEncoder for YamlCodec {
    fn encode(&self, value: &Value, _content_type: &str) -> Result<Bytes, ParseError> {
        // YAML 1.2 reads JSON, and JSON text keeps integer literals exact.
        if needs_literal(value) {
            return serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| ParseError::other("cannot encode YAML body").with_source(e));
        }
        serde_yaml::to_string(&to_yaml(value))
            .map(Bytes::from)
            .map_err(|e| ParseError::other("cannot encode YAML body").with_source(e))
    }
}

// JSON numbers are stored as their literal text, which serde_yaml would see as
// an opaque map, so the tree is converted by hand.
fn to_yaml(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::Number(n) => {
            let exact = integer_value(n);
            if let Some(i) = exact.and_then(|i| i64::try_from(i).ok()) {
                serde_yaml::Value::Number(i.into())
            } else if let Some(u) = exact.and_then(|i| u64::try_from(i).ok()) {
                serde_yaml::Value::Number(u.into())
            } else if let Some(f) = n.as_f64() {
                serde_yaml::Value::Number(f.into())
            } else {
                serde_yaml::Value::String(n.to_string())
            }
        }
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::Array(items) => serde_yaml::Value::Sequence(items.iter().map(to_yaml).collect()),
        Value::Object(map) => serde_yaml::Value::Mapping(
            map.iter()
                .map(|(key, item)| (serde_yaml::Value::String(key.clone()), to_yaml(item)))
                .collect(),
        ),
    }
}

/// Whether the tree holds an integer that neither `i64` nor `u64` can carry.
fn needs_literal(value: &Value) -> bool {
    match value {
        Value::Number(n) => is_integer(n) && !fits_yaml_integer(n),
        Value::Array(items) => items.iter().any(needs_literal),
        Value::Object(map) => map.values().any(needs_literal),
        _ => false,
    }
}

fn fits_yaml_integer(n: &Number) -> bool {
    integer_value(n).is_some_and(|i| i64::try_from(i).is_ok() || u64::try_from(i).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyCodecRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn test_decode() {
        let registry = BodyCodecRegistry::empty();
        let input = DecodeInput::new("application/yaml", &registry);
        let value = YamlCodec
            .decode(Bytes::from_static(b"name: Rex\ntags: [a, b]\nage: 3\n"), input)
            .await
            .unwrap();
        assert_eq!(value, json!({"name": "Rex", "tags": ["a", "b"], "age": 3}));
    }

    #[tokio::test]
    async fn test_encode_keeps_numbers() {
        let registry = BodyCodecRegistry::empty();
        let input = DecodeInput::new("application/yaml", &registry);
        let value = json!({"count": 3, "ratio": 0.5, "tag": "x"});
        let encoded = YamlCodec.encode(&value, "application/yaml").unwrap();
        let decoded = YamlCodec.decode(encoded, input).await.unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_encode_keeps_huge_integer_literal() {
        let literal = "123456789012345678901234567890123456789";
        let value: Value = serde_json::from_str(&format!(r#"{{"id": {literal}, "tags": ["a"]}}"#)).unwrap();

        let encoded = YamlCodec.encode(&value, "application/yaml").unwrap();
        let text = std::str::from_utf8(&encoded).unwrap();
        assert!(text.contains(literal), "{text}");
        assert!(serde_yaml::from_str::<serde_yaml::Value>(text).is_ok());
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), value);
    }

    #[test]
    fn test_u64_stays_block_yaml() {
        let value = json!({"id": u64::MAX});
        let encoded = YamlCodec.encode(&value, "application/yaml").unwrap();
        assert_eq!(std::str::from_utf8(&encoded).unwrap(), "id: 18446744073709551615\n");
    }
}
