//! Codec tests against the pet store document.
//!
//! Parameters and bodies are taken from resolved routes rather than built
//! by hand, so these tests also cover how the document model feeds the
//! codecs.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Uri};
use nomos_core::fixtures::route;
use nomos_core::{Location, Parameter, ParseErrorKind, PathSegment, Route, Schema};
use nomos_extract::{
    encode, BodyCodecRegistry, Decoded, DecodeInput, ParameterCodec, ParameterContext,
};
use proptest::prelude::*;
use serde_json::json;

fn pet_route(method: &Method, template: &str) -> Route {
    route(method, template).expect("route exists in the pet store")
}

fn decode_first(route: &Route, uri: &str, headers: &HeaderMap) -> Decoded {
    let uri: Uri = uri.parse().unwrap();
    let ctx = ParameterContext::new(&route.path_params, &uri, headers).unwrap();
    ParameterCodec::new()
        .decode(&route.operation.parameters[0], &ctx)
        .unwrap()
}

#[test]
fn test_label_array_path_parameter() {
    let route = pet_route(&Method::GET, "/tags/{tags}").path_param("tags", ".foo,bar");
    let decoded = decode_first(&route, "/tags/.foo,bar", &HeaderMap::new());
    assert_eq!(decoded, Decoded::Value(json!(["foo", "bar"])));
}

#[test]
fn test_label_without_prefix_is_invalid() {
    let route = pet_route(&Method::GET, "/tags/{tags}").path_param("tags", "foo,bar");
    let uri: Uri = "/tags/foo,bar".parse().unwrap();
    let headers = HeaderMap::new();
    let ctx = ParameterContext::new(&route.path_params, &uri, &headers).unwrap();
    let err = ParameterCodec::new()
        .decode(&route.operation.parameters[0], &ctx)
        .unwrap_err();
    assert_eq!(err.parse_kind(), Some(ParseErrorKind::InvalidFormat));
}

#[test]
fn test_deep_object_with_composed_property() {
    let route = pet_route(&Method::GET, "/search");
    let decoded = decode_first(&route, "/search?filter%5Bid%5D%5Beq%5D=1", &HeaderMap::new());
    assert_eq!(decoded, Decoded::Value(json!({"id": {"eq": "1"}})));

    let decoded = decode_first(&route, "/search?filter%5Bid%5D=7", &HeaderMap::new());
    assert_eq!(decoded, Decoded::Value(json!({"id": "7"})));
}

#[test]
fn test_query_default_round_trips_through_encoder() {
    let route = pet_route(&Method::GET, "/pets");
    let limit = route
        .operation
        .parameters
        .iter()
        .find(|p| p.name == "limit")
        .unwrap();
    let default = limit.schema().and_then(|s| s.default.clone()).unwrap();
    let pairs = encode::encode_query(limit, &default);
    let query = encode::append_query(Some("status=sold"), &pairs);
    assert_eq!(query, "status=sold&limit=20");

    let uri: Uri = format!("/pets?{query}").parse().unwrap();
    let headers = HeaderMap::new();
    let ctx = ParameterContext::new(&route.path_params, &uri, &headers).unwrap();
    let decoded = ParameterCodec::new().decode(limit, &ctx).unwrap();
    assert_eq!(decoded, Decoded::Value(json!(20)));
}

#[test]
fn test_cookie_parameter() {
    let route = pet_route(&Method::GET, "/pets");
    let session = route
        .operation
        .parameters
        .iter()
        .find(|p| p.name == "session")
        .unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(http::header::COOKIE, HeaderValue::from_static("theme=dark; session=s3cr3t"));
    let uri: Uri = "/pets".parse().unwrap();
    let ctx = ParameterContext::new(&route.path_params, &uri, &headers).unwrap();
    let decoded = ParameterCodec::new().decode(session, &ctx).unwrap();
    assert_eq!(decoded, Decoded::Value(json!("s3cr3t")));
}

const BOUNDARY: &str = "pet-upload";

fn upload_body(parts: &[(&str, &str)]) -> Bytes {
    let mut body = String::new();
    for (name, data) in parts {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{data}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Bytes::from(body)
}

async fn decode_upload(body: Bytes, content_type: &str) -> Result<serde_json::Value, nomos_core::ParseError> {
    let route = pet_route(&Method::POST, "/uploads");
    let request_body = route.operation.request_body.as_ref().unwrap();
    let (_, media) = request_body.content.get(content_type).unwrap();
    let registry = BodyCodecRegistry::new();
    let input = DecodeInput::new(content_type, &registry)
        .schema(media.schema.as_ref())
        .encoding(&media.encoding);
    registry.decode(body, input).await
}

#[tokio::test]
async fn test_multipart_part_uses_declared_encoding() {
    let body = upload_body(&[("file", "raw bytes"), ("metadata", r#"{"title":"Rex"}"#)]);
    let value = decode_upload(body, &format!("multipart/form-data; boundary={BOUNDARY}"))
        .await
        .unwrap();
    assert_eq!(value, json!({"file": "raw bytes", "metadata": {"title": "Rex"}}));
}

#[tokio::test]
async fn test_multipart_undeclared_part_is_other() {
    let body = upload_body(&[("file", "raw bytes"), ("thumbnail", "x")]);
    let err = decode_upload(body, &format!("multipart/form-data; boundary={BOUNDARY}"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::Other);
    assert_eq!(err.path(), &[PathSegment::from("thumbnail")]);
}

#[tokio::test]
async fn test_urlencoded_body() {
    let value = decode_upload(
        Bytes::from_static(b"title=Rex&ids=1&ids=2"),
        "application/x-www-form-urlencoded",
    )
    .await
    .unwrap();
    assert_eq!(value, json!({"title": "Rex", "ids": [1, 2]}));
}

proptest! {
    #[test]
    fn prop_int64_path_parameter(n in any::<i64>()) {
        let route = pet_route(&Method::GET, "/pets/{petId}").path_param("petId", n.to_string());
        let decoded = decode_first(&route, &format!("/pets/{n}"), &HeaderMap::new());
        prop_assert_eq!(decoded, Decoded::Value(json!(n)));
    }

    #[test]
    fn prop_simple_path_string_survives_percent_encoding(raw in "\\PC{1,24}") {
        let name = Parameter::builder("name", Location::Path)
            .schema(Schema::string())
            .required(true)
            .build()
            .unwrap();
        let path_params = HashMap::from([("name".to_string(), urlencoding::encode(&raw).into_owned())]);
        let uri: Uri = "/names/x".parse().unwrap();
        let headers = HeaderMap::new();
        let ctx = ParameterContext::new(&path_params, &uri, &headers).unwrap();

        let decoded = ParameterCodec::new().decode(&name, &ctx).unwrap();
        prop_assert_eq!(decoded, Decoded::Value(json!(raw)));
    }
}
