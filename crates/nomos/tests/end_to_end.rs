//! A configured sentinel validating a full request/response exchange.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, Response};
use nomos::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

const CONFIG: &str = r#"
[validation]
multi_error = true
include_response_status = true

[logging]
enabled = false
"#;

struct ApiKey;

#[async_trait]
impl Authenticator for ApiKey {
    async fn authenticate(&self, input: AuthenticationInput<'_>) -> Result<(), AuthenticationError> {
        if input.api_key().as_deref() == Some("k1") {
            Ok(())
        } else {
            Err(AuthenticationError::rejected(input.scheme_name, "unknown key"))
        }
    }
}

fn configured_sentinel() -> Sentinel {
    let config = ConfigLoader::new()
        .with_string(CONFIG, "toml")
        .unwrap()
        .load()
        .unwrap();
    Sentinel::builder()
        .options(config.validation.to_options())
        .authenticator(ApiKey)
        .build()
}

fn list_route() -> Route {
    nomos::core::fixtures::route(&Method::GET, "/pets").unwrap()
}

// =============================================================================
// Exchange
// =============================================================================

#[tokio::test]
async fn test_valid_exchange() {
    let sentinel = configured_sentinel();
    let route = list_route();

    let mut request = Request::get("/pets?status=available")
        .header("x-api-key", "k1")
        .body(Bytes::new())
        .unwrap();
    sentinel
        .validate_request(&mut RequestValidationInput::new(&mut request, &route))
        .await
        .unwrap();
    assert_eq!(request.uri().query(), Some("status=available&limit=20"));

    let response = Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .header("x-rate-limit", "100")
        .body(Bytes::from_static(br#"[{"id": 1, "name": "rex"}]"#))
        .unwrap();
    sentinel
        .validate_response(ResponseValidationInput::new(&response, &route))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_configured_multi_error_and_status() {
    let sentinel = configured_sentinel();
    let route = list_route();

    let mut request = Request::get("/pets?limit=0").body(Bytes::new()).unwrap();
    let err = sentinel
        .validate_request(&mut RequestValidationInput::new(&mut request, &route))
        .await
        .unwrap_err();
    assert_eq!(err.errors().len(), 2);
    assert!(matches!(err.errors()[1], ValidationError::Security(_)));

    let pet_route = nomos::core::fixtures::route(&Method::GET, "/pets/{petId}").unwrap();
    let response = Response::builder().status(418).body(Bytes::new()).unwrap();
    let err = sentinel
        .validate_response(ResponseValidationInput::new(&response, &pet_route))
        .await
        .unwrap_err();
    assert_eq!(err.as_response().unwrap().status, 418);
}
