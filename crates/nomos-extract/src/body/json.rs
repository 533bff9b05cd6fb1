//! `application/json` and `+json` media types.

use async_trait::async_trait;
use bytes::Bytes;
use nomos_core::{ParseError, ParseErrorKind};
use serde_json::Value;

use super::{BodyDecoder, BodyEncoder, DecodeInput};

/// JSON decoder and encoder.
///
/// Numbers keep their literal text, so `int64` values survive a decode and
/// encode round trip byte for byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[async_trait]
impl BodyDecoder for JsonCodec {
    async fn decode(&self, body: Bytes, _input: DecodeInput<'_>) -> Result<Value, ParseError> {
        serde_json::from_slice(&body).map_err(|e| {
            ParseError::new(ParseErrorKind::InvalidFormat, "invalid JSON body").with_source(e)
        })
    }
}

impl BodyEncoder for JsonCodec {
    fn encode(&self, value: &Value, _content_type: &str) -> Result<Bytes, ParseError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| ParseError::other("cannot encode JSON body").with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyCodecRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn test_decode() {
        let registry = BodyCodecRegistry::empty();
        let input = DecodeInput::new("application/json", &registry);
        let value = JsonCodec
            .decode(Bytes::from_static(br#"{"a": [1, 2.5]}"#), input)
            .await
            .unwrap();
        assert_eq!(value, json!({"a": [1, 2.5]}));

        let err = JsonCodec.decode(Bytes::from_static(b"{"), input).await.unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::InvalidFormat);
    }

    #[tokio::test]
    async fn test_int64_round_trip() {
        let registry = BodyCodecRegistry::empty();
        let input = DecodeInput::new("application/json", &registry);
        let body = Bytes::from_static(br#"{"testInteger":9223372036854775807}"#);
        let value = JsonCodec.decode(body.clone(), input).await.unwrap();
        assert_eq!(JsonCodec.encode(&value, "application/json").unwrap(), body);
    }
}
