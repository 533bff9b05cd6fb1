//! `text/*` and `application/octet-stream`.

use async_trait::async_trait;
use bytes::Bytes;
use nomos_core::{ParseError, ParseErrorKind};
use serde_json::Value;

use super::{BodyDecoder, BodyEncoder, DecodeInput};

/// Passes text through as a JSON string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

#[async_trait]
impl BodyDecoder for TextCodec {
    async fn decode(&self, body: Bytes, _input: DecodeInput<'_>) -> Result<Value, ParseError> {
        String::from_utf8(body.to_vec())
            .map(Value::String)
            .map_err(|e| {
                ParseError::new(ParseErrorKind::InvalidFormat, "text body is not valid UTF-8")
                    .with_source(e)
            })
    }
}

impl BodyEncoder for TextCodec {
    fn encode(&self, value: &Value, _content_type: &str) -> Result<Bytes, ParseError> {
        Ok(match value {
            Value::String(text) => Bytes::from(text.clone()),
            other => Bytes::from(other.to_string()),
        })
    }
}

/// Raw bytes as a (lossily decoded) string.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctetStreamDecoder;

#[async_trait]
impl BodyDecoder for OctetStreamDecoder {
    async fn decode(&self, body: Bytes, _input: DecodeInput<'_>) -> Result<Value, ParseError> {
        Ok(Value::String(String::from_utf8_lossy(&body).into_owned()))
    }
}
