//! # Nomos Extract
//!
//! Parameter and body codecs for OpenAPI 3 operations.
//!
//! Parameters are decoded from a [`ParameterContext`] by a
//! [`ParameterCodec`], following the parameter's location and its
//! `style`/`explode` serialization:
//!
//! | Location | Styles | Default |
//! |----------|--------|---------|
//! | path | `simple`, `label`, `matrix` | `simple`, `explode: false` |
//! | query | `form`, `spaceDelimited`, `pipeDelimited`, `deepObject` | `form`, `explode: true` |
//! | header | `simple` | `simple`, `explode: false` |
//! | cookie | `form` | `form`, `explode: true` |
//!
//! Bodies are decoded by the [`BodyDecoder`] registered in a
//! [`BodyCodecRegistry`] for their media type, and encoded back by the
//! matching [`BodyEncoder`] when injected defaults must be written into the
//! request.
//!
//! ```text
//!   raw request ──▶ ParameterContext ──▶ ParameterCodec::decode ──▶ Decoded
//!        │
//!        └── body ──▶ BodyCodecRegistry::decode(DecodeInput) ──▶ serde_json::Value
//! ```
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use http::{HeaderMap, Uri};
//! use nomos_core::{Location, Parameter, Schema, Style};
//! use nomos_extract::{Decoded, ParameterCodec, ParameterContext};
//! use serde_json::json;
//!
//! let filter = Parameter::builder("filter", Location::Query)
//!     .schema(Schema::object().property("size", Schema::integer()))
//!     .style(Style::DeepObject, true)
//!     .build()
//!     .unwrap();
//!
//! let path_params = HashMap::new();
//! let uri = Uri::from_static("/search?filter%5Bsize%5D=3");
//! let headers = HeaderMap::new();
//! let ctx = ParameterContext::new(&path_params, &uri, &headers).unwrap();
//!
//! let decoded = ParameterCodec::new().decode(&filter, &ctx).unwrap();
//! assert_eq!(decoded, Decoded::Value(json!({"size": 3})));
//! ```
//!
//! ## Errors
//!
//! Malformed input is reported as a [`nomos_core::ParseError`] whose path
//! points into the value. A serialization that a location cannot carry
//! is a [`nomos_core::DocumentError`]; both are wrapped in [`DecodeError`].

#![doc(html_root_url = "https://docs.rs/nomos-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod body;
mod context;
mod error;
pub mod param;

pub use body::{
    media_essence, BodyCodecRegistry, BodyDecoder, BodyEncoder, DecodeInput, FormCodec,
    JsonCodec, MultipartDecoder, OctetStreamDecoder, TextCodec, YamlCodec,
};
pub use context::{parse_query, Cookies, ParameterContext};
pub use error::DecodeError;
pub use param::{encode, Decoded, ParameterCodec};
