//! Parameters described by `content` instead of `schema`.

use nomos_core::{Location, Parameter, ParseError, Schema, SchemaKind};
use serde_json::Value;

use super::primitive::percent_decode;
use super::Decoded;
use crate::context::ParameterContext;
use crate::error::DecodeError;

/// Reads the raw text of a content parameter and decodes it.
///
/// JSON media types are parsed as JSON. When that fails and the schema does
/// not ask for an object or array, the raw string is kept.
pub(crate) fn decode(
    param: &Parameter,
    media_type: &str,
    schema: Option<&Schema>,
    ctx: &ParameterContext<'_>,
) -> Result<Decoded, DecodeError> {
    let raw = match param.location {
        Location::Path => ctx.path_param(&param.name).map(percent_decode).transpose()?,
        Location::Query => match ctx.query_values(&param.name).as_slice() {
            [] => None,
            [raw] => Some((*raw).to_string()),
            values => {
                return Err(ParseError::invalid_format(
                    values.join("&"),
                    "a content parameter must not repeat",
                )
                .into())
            }
        },
        Location::Header => ctx.header(&param.name),
        Location::Cookie => ctx.cookie(&param.name).map(str::to_string),
    };
    let Some(raw) = raw else {
        return Ok(Decoded::Absent);
    };
    if raw.is_empty() {
        return Ok(Decoded::Empty);
    }
    if !is_json(media_type) {
        return Ok(Decoded::Value(Value::String(raw)));
    }
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Decoded::Value(value)),
        Err(_) if !wants_structure(schema) => Ok(Decoded::Value(Value::String(raw))),
        Err(e) => Err(ParseError::invalid_format(raw, "invalid JSON").with_source(e).into()),
    }
}

fn is_json(media_type: &str) -> bool {
    let Ok(mime) = media_type.trim().parse::<mime::Mime>() else {
        return false;
    };
    mime.essence_str() == mime::APPLICATION_JSON.essence_str()
        || mime.suffix() == Some(mime::JSON)
}

fn wants_structure(schema: Option<&Schema>) -> bool {
    schema.is_some_and(|s| matches!(s.kind, SchemaKind::Array(_) | SchemaKind::Object(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use http::{HeaderMap, Uri};
    use nomos_core::ParseErrorKind;
    use serde_json::json;

    fn query_param(schema: Schema) -> Parameter {
        Parameter::builder("coords", Location::Query)
            .content("application/json", Some(schema))
            .build()
            .unwrap()
    }

    fn decode_query(param: &Parameter, uri: &'static str) -> Result<Decoded, DecodeError> {
        let params = HashMap::new();
        let headers = HeaderMap::new();
        let uri = Uri::from_static(uri);
        let ctx = ParameterContext::new(&params, &uri, &headers).unwrap();
        decode(param, "application/json", param.schema(), &ctx)
    }

    #[test]
    fn test_json_object() {
        let param = query_param(Schema::object().property("lat", Schema::number()));
        let decoded = decode_query(&param, "/?coords=%7B%22lat%22%3A1.5%7D").unwrap();
        assert_eq!(decoded, Decoded::Value(json!({"lat": 1.5})));
    }

    #[test]
    fn test_plain_string_falls_back() {
        let param = query_param(Schema::string());
        let decoded = decode_query(&param, "/?coords=north").unwrap();
        assert_eq!(decoded, Decoded::Value(json!("north")));
    }

    #[test]
    fn test_invalid_json_for_object() {
        let param = query_param(Schema::object());
        let err = decode_query(&param, "/?coords=north").unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::InvalidFormat));
    }

    #[test]
    fn test_repeated_query_is_rejected() {
        let param = query_param(Schema::string());
        assert!(decode_query(&param, "/?coords=a&coords=b").is_err());
        assert_eq!(decode_query(&param, "/").unwrap(), Decoded::Absent);
    }

    #[test]
    fn test_media_type_detection() {
        assert!(is_json("application/json; charset=utf-8"));
        assert!(is_json("application/vnd.api+json"));
        assert!(!is_json("text/plain"));
    }
}
