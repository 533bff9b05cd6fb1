//! Response validation against the pet store document.

use bytes::Bytes;
use http::{Method, Response};
use metrics_exporter_prometheus::PrometheusBuilder;
use nomos_core::fixtures::route;
use nomos_core::Route;
use nomos_sentinel::{
    EndpointType, Options, RequestValidationInput, ResponseErrorCause, ResponseTarget,
    ResponseValidationInput, Sentinel, ValidationError,
};
use proptest::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

fn pet_route(method: &Method, template: &str) -> Route {
    route(method, template).expect("route exists in the pet store")
}

fn json_response(status: u16, body: &'static str) -> Response<Bytes> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("x-rate-limit", "100")
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
}

async fn validate(sentinel: &Sentinel, response: &Response<Bytes>, route: &Route) -> Result<(), ValidationError> {
    sentinel
        .validate_response(ResponseValidationInput::new(response, route))
        .await
}

// =============================================================================
// Status handling
// =============================================================================

#[tokio::test]
async fn test_not_modified_always_passes() {
    let route = pet_route(&Method::GET, "/pets/{petId}");
    let response = Response::builder()
        .status(304)
        .header("content-type", "text/html")
        .body(Bytes::from_static(b"<p>not json</p>"))
        .unwrap();

    let sentinel = Sentinel::builder()
        .options(Options::new().include_response_status(true))
        .build();
    validate(&sentinel, &response, &route).await.unwrap();
}

#[tokio::test]
async fn test_head_request_always_passes() {
    let route = pet_route(&Method::GET, "/pets");
    let response = Response::builder().status(200).body(Bytes::new()).unwrap();

    let input = ResponseValidationInput::new(&response, &route).request_method(&Method::HEAD);
    Sentinel::new().validate_response(input).await.unwrap();

    let route = pet_route(&Method::HEAD, "/health");
    validate(&Sentinel::new(), &response, &route).await.unwrap();
}

#[tokio::test]
async fn test_undocumented_status() {
    let route = pet_route(&Method::GET, "/pets/{petId}");
    let response = json_response(404, "{}");

    validate(&Sentinel::new(), &response, &route).await.unwrap();

    let sentinel = Sentinel::builder()
        .options(Options::new().include_response_status(true))
        .build();
    let err = validate(&sentinel, &response, &route).await.unwrap_err();
    let response_err = err.as_response().unwrap();
    assert_eq!(response_err.target, ResponseTarget::Status);
    assert!(matches!(response_err.cause, ResponseErrorCause::UndocumentedStatus));
}

#[tokio::test]
async fn test_default_response_is_used() {
    let route = pet_route(&Method::GET, "/pets");

    let response = json_response(500, r#"{"code": 500, "message": "boom"}"#);
    validate(&Sentinel::new(), &response, &route).await.unwrap();

    let response = json_response(500, r#"{"code": "boom"}"#);
    let err = validate(&Sentinel::new(), &response, &route).await.unwrap_err();
    assert_eq!(err.as_response().unwrap().target, ResponseTarget::Body);
}

// =============================================================================
// Headers and body
// =============================================================================

#[tokio::test]
async fn test_valid_list_response() {
    let route = pet_route(&Method::GET, "/pets");
    let response = json_response(200, r#"[{"id": 1, "name": "rex", "status": "sold"}]"#);
    validate(&Sentinel::new(), &response, &route).await.unwrap();
}

#[tokio::test]
async fn test_required_response_header() {
    let route = pet_route(&Method::GET, "/pets");
    let response = Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .body(Bytes::from_static(b"[]"))
        .unwrap();

    let err = validate(&Sentinel::new(), &response, &route).await.unwrap_err();
    let response_err = err.as_response().unwrap();
    assert_eq!(response_err.target, ResponseTarget::Header("X-Rate-Limit".into()));
    assert!(matches!(response_err.cause, ResponseErrorCause::Required));
    assert_eq!(response_err.status, 200);
}

#[tokio::test]
async fn test_response_header_schema() {
    let route = pet_route(&Method::GET, "/pets");
    let response = Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .header("x-rate-limit", "lots")
        .body(Bytes::from_static(b"[]"))
        .unwrap();

    let err = validate(&Sentinel::new(), &response, &route).await.unwrap_err();
    assert!(matches!(
        err.as_response().unwrap().cause,
        ResponseErrorCause::Parse(_)
    ));
}

#[tokio::test]
async fn test_write_only_property_in_response() {
    let route = pet_route(&Method::GET, "/pets");
    let response = json_response(200, r#"[{"name": "rex", "secret": "s3cr3t"}]"#);

    let err = validate(&Sentinel::new(), &response, &route).await.unwrap_err();
    let violation = err.as_response().unwrap().schema_violation().unwrap();
    assert!(violation.deepest().unwrap().is_access_violation());

    let sentinel = Sentinel::builder()
        .options(Options::new().endpoint_type(EndpointType::Write))
        .build();
    validate(&sentinel, &response, &route).await.unwrap();

    let sentinel = Sentinel::builder()
        .options(Options::new().exclude_response_body(true))
        .build();
    validate(&sentinel, &response, &route).await.unwrap();
}

#[tokio::test]
async fn test_response_content_type_checks() {
    let route = pet_route(&Method::GET, "/pets/{petId}");

    let response = Response::builder()
        .status(200)
        .body(Bytes::from_static(b"{}"))
        .unwrap();
    let err = validate(&Sentinel::new(), &response, &route).await.unwrap_err();
    assert!(matches!(
        err.as_response().unwrap().cause,
        ResponseErrorCause::MissingContentType
    ));

    let response = Response::builder()
        .status(200)
        .header("content-type", "application/xml")
        .body(Bytes::from_static(b"<pet/>"))
        .unwrap();
    let err = validate(&Sentinel::new(), &response, &route).await.unwrap_err();
    assert!(matches!(
        err.as_response().unwrap().cause,
        ResponseErrorCause::UnexpectedContentType(_)
    ));
}

#[tokio::test]
async fn test_multi_error_response() {
    let route = pet_route(&Method::GET, "/pets");
    let response = Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .body(Bytes::from_static(br#"[{"name": ""}]"#))
        .unwrap();
    let sentinel = Sentinel::builder()
        .options(Options::new().multi_error(true))
        .build();

    let err = validate(&sentinel, &response, &route).await.unwrap_err();
    let errors = err.errors();
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        errors[0].as_response().unwrap().target,
        ResponseTarget::Header(_)
    ));
    assert_eq!(errors[1].as_response().unwrap().target, ResponseTarget::Body);
}

// =============================================================================
// Metrics
// =============================================================================

#[test]
fn test_validations_are_counted() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        tokio_test::block_on(async {
            let sentinel = Sentinel::new();
            let route = pet_route(&Method::POST, "/numbers");

            let mut request = http::Request::post("/numbers")
                .header("content-type", "application/json")
                .body(Bytes::from_static(br#"{"testInteger": "seven"}"#))
                .unwrap();
            let mut input = RequestValidationInput::new(&mut request, &route);
            assert!(sentinel.validate_request(&mut input).await.is_err());

            let response = Response::builder().status(200).body(Bytes::new()).unwrap();
            validate(&sentinel, &response, &route).await.unwrap();
        });
    });

    let rendered = handle.render();
    assert!(rendered.contains(r#"nomos_validations_total{direction="request",outcome="invalid"} 1"#));
    assert!(rendered.contains(r#"nomos_validations_total{direction="response",outcome="valid"} 1"#));
    assert!(rendered.contains(r#"nomos_validation_failures_total{stage="body"} 1"#));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_not_modified_ignores_body(body in proptest::collection::vec(any::<u8>(), 0..64)) {
        let route = pet_route(&Method::GET, "/pets/{petId}");
        let response = Response::builder()
            .status(304)
            .body(Bytes::from(body))
            .unwrap();
        let sentinel = Sentinel::builder()
            .options(Options::new().include_response_status(true).multi_error(true))
            .build();
        let result = tokio_test::block_on(validate(&sentinel, &response, &route));
        prop_assert!(result.is_ok());
    }

    #[test]
    fn prop_rate_limit_header_accepts_integers(limit in any::<i32>()) {
        let route = pet_route(&Method::GET, "/pets");
        let response = Response::builder()
            .status(200)
            .header("content-type", "application/json")
            .header("x-rate-limit", limit.to_string())
            .body(Bytes::from_static(b"[]"))
            .unwrap();
        let result = tokio_test::block_on(validate(&Sentinel::new(), &response, &route));
        prop_assert!(result.is_ok());
    }
}
