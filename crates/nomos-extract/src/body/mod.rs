//! Body decoding and encoding.
//!
//! A [`BodyCodecRegistry`] maps media types to [`BodyDecoder`]s and
//! [`BodyEncoder`]s. Lookup tries the exact media type, then the `+json`
//! suffix, then the `type/*` wildcard.
//!
//! | media type | decoder | encoder |
//! |---|---|---|
//! | `application/json`, `*/*+json` | [`JsonCodec`] | [`JsonCodec`] |
//! | `application/yaml`, `application/x-yaml` | [`YamlCodec`] | [`YamlCodec`] |
//! | `application/x-www-form-urlencoded` | [`FormCodec`] | [`FormCodec`] |
//! | `multipart/form-data` | [`MultipartDecoder`] | |
//! | `text/*` | [`TextCodec`] | [`TextCodec`] |
//! | `application/octet-stream` | [`OctetStreamDecoder`] | |

mod form;
mod json;
mod multipart;
mod text;
mod yaml;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use nomos_core::{Encoding, ParseError, Schema};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

pub use form::FormCodec;
pub use json::JsonCodec;
pub use multipart::MultipartDecoder;
pub use text::{OctetStreamDecoder, TextCodec};
pub use yaml::YamlCodec;

/// Everything a decoder may need besides the bytes.
#[derive(Debug, Clone, Copy)]
pub struct DecodeInput<'a> {
    /// The full `Content-Type` value, parameters included.
    pub content_type: &'a str,
    /// The schema of the body, if declared.
    pub schema: Option<&'a Schema>,
    /// Per-property encodings for form and multipart bodies.
    pub encoding: Option<&'a IndexMap<String, Encoding>>,
    /// The registry, for decoders that decode nested parts.
    pub registry: &'a BodyCodecRegistry,
}

impl<'a> DecodeInput<'a> {
    /// Input with no schema and no encodings.
    pub fn new(content_type: &'a str, registry: &'a BodyCodecRegistry) -> Self {
        Self {
            content_type,
            schema: None,
            encoding: None,
            registry,
        }
    }

    /// Sets the schema.
    #[must_use]
    pub fn schema(mut self, schema: Option<&'a Schema>) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the per-property encodings.
    #[must_use]
    pub fn encoding(mut self, encoding: &'a IndexMap<String, Encoding>) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// The encoding declared for a property.
    pub fn property_encoding(&self, property: &str) -> Option<&'a Encoding> {
        self.encoding.and_then(|encoding| encoding.get(property))
    }
}

/// Turns body bytes into a value.
#[async_trait]
pub trait BodyDecoder: Send + Sync {
    /// Decodes `body`.
    async fn decode(&self, body: Bytes, input: DecodeInput<'_>) -> Result<Value, ParseError>;
}

/// Turns a value back into body bytes.
pub trait BodyEncoder: Send + Sync {
    /// Encodes `value` for `content_type`.
    fn encode(&self, value: &Value, content_type: &str) -> Result<Bytes, ParseError>;
}

/// Decoders and encoders by media type.
///
/// The registry is shared behind an [`Arc`]; registration takes a write
/// lock, lookups a read lock that is released before decoding starts.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use nomos_extract::{BodyCodecRegistry, DecodeInput, JsonCodec};
///
/// # tokio_test::block_on(async {
/// let registry = BodyCodecRegistry::new();
/// registry.register_decoder("application/vnd.pets", JsonCodec);
///
/// let value = registry
///     .decode(Bytes::from_static(b"{\"name\":\"Rex\"}"), DecodeInput::new("application/vnd.pets", &registry))
///     .await
///     .unwrap();
/// assert_eq!(value["name"], "Rex");
/// # });
/// ```
pub struct BodyCodecRegistry {
    decoders: RwLock<HashMap<String, Arc<dyn BodyDecoder>>>,
    encoders: RwLock<HashMap<String, Arc<dyn BodyEncoder>>>,
}

impl std::fmt::Debug for BodyCodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut decoders: Vec<String> = self.decoders.read().keys().cloned().collect();
        let mut encoders: Vec<String> = self.encoders.read().keys().cloned().collect();
        decoders.sort();
        encoders.sort();
        f.debug_struct("BodyCodecRegistry")
            .field("decoders", &decoders)
            .field("encoders", &encoders)
            .finish()
    }
}

impl Default for BodyCodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyCodecRegistry {
    /// A registry with the built-in codecs.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_decoder("application/json", JsonCodec);
        registry.register_decoder("application/yaml", YamlCodec);
        registry.register_decoder("application/x-yaml", YamlCodec);
        registry.register_decoder("application/x-www-form-urlencoded", FormCodec);
        registry.register_decoder("multipart/form-data", MultipartDecoder);
        registry.register_decoder("text/*", TextCodec);
        registry.register_decoder("application/octet-stream", OctetStreamDecoder);

        registry.register_encoder("application/json", JsonCodec);
        registry.register_encoder("application/yaml", YamlCodec);
        registry.register_encoder("application/x-yaml", YamlCodec);
        registry.register_encoder("application/x-www-form-urlencoded", FormCodec);
        registry.register_encoder("text/*", TextCodec);
        registry
    }

    /// A registry without any codec.
    pub fn empty() -> Self {
        Self {
            decoders: RwLock::new(HashMap::new()),
            encoders: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry, created with the built-in codecs.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<BodyCodecRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Registers a decoder, replacing any previous one.
    pub fn register_decoder(&self, media_type: &str, decoder: impl BodyDecoder + 'static) {
        self.decoders
            .write()
            .insert(media_type.to_ascii_lowercase(), Arc::new(decoder));
    }

    /// Removes a decoder.
    pub fn unregister_decoder(&self, media_type: &str) {
        self.decoders.write().remove(&media_type.to_ascii_lowercase());
    }

    /// Registers an encoder, replacing any previous one.
    pub fn register_encoder(&self, media_type: &str, encoder: impl BodyEncoder + 'static) {
        self.encoders
            .write()
            .insert(media_type.to_ascii_lowercase(), Arc::new(encoder));
    }

    /// Removes an encoder.
    pub fn unregister_encoder(&self, media_type: &str) {
        self.encoders.write().remove(&media_type.to_ascii_lowercase());
    }

    /// Media types with a registered decoder, sorted.
    pub fn decoder_media_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.decoders.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// The decoder for a `Content-Type` value.
    pub fn decoder(&self, content_type: &str) -> Option<Arc<dyn BodyDecoder>> {
        lookup(&*self.decoders.read(), content_type)
    }

    /// The encoder for a `Content-Type` value.
    pub fn encoder(&self, content_type: &str) -> Option<Arc<dyn BodyEncoder>> {
        lookup(&*self.encoders.read(), content_type)
    }

    /// Decodes a body with the decoder registered for its content type.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` when no decoder is registered, otherwise whatever
    /// the decoder reports.
    pub async fn decode(&self, body: Bytes, input: DecodeInput<'_>) -> Result<Value, ParseError> {
        let decoder = self.decoder(input.content_type).ok_or_else(|| {
            ParseError::unsupported_format(format!(
                "unsupported content type {:?}",
                media_essence(input.content_type)
            ))
        })?;
        debug!(content_type = %input.content_type, bytes = body.len(), "decoding body");
        decoder.decode(body, input).await
    }

    /// Encodes a value with the encoder registered for its content type.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` when no encoder is registered, otherwise whatever
    /// the encoder reports.
    pub fn encode(&self, value: &Value, content_type: &str) -> Result<Bytes, ParseError> {
        let encoder = self.encoder(content_type).ok_or_else(|| {
            ParseError::unsupported_format(format!(
                "no encoder for content type {:?}",
                media_essence(content_type)
            ))
        })?;
        encoder.encode(value, content_type)
    }
}

/// The lowercase `type/subtype` of a `Content-Type` value.
pub fn media_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn lookup<T: ?Sized>(table: &HashMap<String, Arc<T>>, content_type: &str) -> Option<Arc<T>> {
    let essence = media_essence(content_type);
    if let Some(found) = table.get(&essence) {
        return Some(Arc::clone(found));
    }
    if essence.ends_with("+json") {
        if let Some(found) = table.get("application/json") {
            return Some(Arc::clone(found));
        }
    }
    let (ty, _) = essence.split_once('/')?;
    table.get(&format!("{ty}/*")).map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomos_core::ParseErrorKind;

    #[test]
    fn test_lookup_order() {
        let registry = BodyCodecRegistry::new();
        assert!(registry.decoder("application/json; charset=utf-8").is_some());
        assert!(registry.decoder("application/problem+json").is_some());
        assert!(registry.decoder("text/csv").is_some());
        assert!(registry.decoder("Application/JSON").is_some());
        assert!(registry.decoder("image/png").is_none());
        assert!(registry.encoder("multipart/form-data").is_none());
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = BodyCodecRegistry::empty();
        assert!(registry.decoder("application/json").is_none());
        registry.register_decoder("application/json", JsonCodec);
        assert_eq!(registry.decoder_media_types(), vec!["application/json".to_string()]);
        registry.unregister_decoder("application/json");
        assert!(registry.decoder("application/json").is_none());
    }

    #[tokio::test]
    async fn test_unknown_media_type_is_unsupported() {
        let registry = BodyCodecRegistry::new();
        let err = registry
            .decode(Bytes::from_static(b"\x89PNG"), DecodeInput::new("image/png", &registry))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnsupportedFormat);
        assert_eq!(err.reason(), "unsupported content type \"image/png\"");
    }

    #[test]
    fn test_global_is_shared() {
        let a = BodyCodecRegistry::global();
        let b = BodyCodecRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
