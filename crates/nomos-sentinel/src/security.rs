//! Security requirement checks.
//!
//! Nomos does not verify credentials itself. Each scheme named by a
//! requirement is handed to an [`Authenticator`] supplied by the host; a
//! requirement alternative passes when every one of its schemes does.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Request;
use nomos_core::{ApiKeyLocation, SecurityScheme};
use nomos_extract::Cookies;

use crate::error::AuthenticationError;

/// The scheme to check and the request it applies to.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticationInput<'a> {
    /// Scheme name as declared under `components.securitySchemes`.
    pub scheme_name: &'a str,
    /// The declared scheme.
    pub scheme: &'a SecurityScheme,
    /// Scopes required by the requirement.
    pub scopes: &'a [String],
    /// The request being validated.
    pub request: &'a Request<Bytes>,
}

impl AuthenticationInput<'_> {
    /// The API key sent for an `apiKey` scheme, from its header, query
    /// parameter or cookie.
    pub fn api_key(&self) -> Option<String> {
        let SecurityScheme::ApiKey { name, location } = self.scheme else {
            return None;
        };
        match location {
            ApiKeyLocation::Header => self
                .request
                .headers()
                .get(name.as_str())
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            ApiKeyLocation::Query => {
                let query = self.request.uri().query()?;
                nomos_extract::parse_query(query)
                    .ok()?
                    .into_iter()
                    .find_map(|(key, value)| (key == *name).then_some(value))
            }
            ApiKeyLocation::Cookie => Cookies::from_headers(self.request.headers())
                .get(name)
                .map(str::to_string),
        }
    }

    /// The credentials of an `http` scheme: the `Authorization` value after
    /// the scheme name (e.g. the token of `Bearer <token>`).
    pub fn http_credentials(&self) -> Option<String> {
        let SecurityScheme::Http { scheme, .. } = self.scheme else {
            return None;
        };
        let header = self
            .request
            .headers()
            .get(http::header::AUTHORIZATION)?
            .to_str()
            .ok()?;
        let (given, credentials) = header.split_once(' ')?;
        given
            .eq_ignore_ascii_case(scheme)
            .then(|| credentials.trim().to_string())
    }
}

/// Checks one security scheme against a request.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use nomos_sentinel::{AuthenticationError, AuthenticationInput, Authenticator};
///
/// struct StaticKey(&'static str);
///
/// #[async_trait]
/// impl Authenticator for StaticKey {
///     async fn authenticate(&self, input: AuthenticationInput<'_>) -> Result<(), AuthenticationError> {
///         match input.api_key() {
///             Some(key) if key == self.0 => Ok(()),
///             _ => Err(AuthenticationError::rejected(input.scheme_name, "invalid API key")),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Succeeds when the request satisfies `input.scheme`.
    async fn authenticate(&self, input: AuthenticationInput<'_>) -> Result<(), AuthenticationError>;
}

#[async_trait]
impl<T: Authenticator + ?Sized> Authenticator for Arc<T> {
    async fn authenticate(&self, input: AuthenticationInput<'_>) -> Result<(), AuthenticationError> {
        (**self).authenticate(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, header: Option<(&'static str, &'static str)>) -> Request<Bytes> {
        let mut builder = Request::builder().uri(uri);
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_api_key_locations() {
        let header_scheme = SecurityScheme::ApiKey {
            name: "X-API-Key".into(),
            location: ApiKeyLocation::Header,
        };
        let req = request("/pets", Some(("x-api-key", "k1")));
        let input = AuthenticationInput {
            scheme_name: "api_key",
            scheme: &header_scheme,
            scopes: &[],
            request: &req,
        };
        assert_eq!(input.api_key().as_deref(), Some("k1"));

        let query_scheme = SecurityScheme::ApiKey {
            name: "key".into(),
            location: ApiKeyLocation::Query,
        };
        let req = request("/pets?key=k%202", None);
        let input = AuthenticationInput {
            scheme_name: "api_key",
            scheme: &query_scheme,
            scopes: &[],
            request: &req,
        };
        assert_eq!(input.api_key().as_deref(), Some("k 2"));

        let cookie_scheme = SecurityScheme::ApiKey {
            name: "sid".into(),
            location: ApiKeyLocation::Cookie,
        };
        let req = request("/pets", Some(("cookie", "a=1; sid=k3")));
        let input = AuthenticationInput {
            scheme_name: "session",
            scheme: &cookie_scheme,
            scopes: &[],
            request: &req,
        };
        assert_eq!(input.api_key().as_deref(), Some("k3"));
    }

    #[test]
    fn test_http_credentials() {
        let scheme = SecurityScheme::Http {
            scheme: "bearer".into(),
            bearer_format: Some("JWT".into()),
        };
        let req = request("/pets", Some(("authorization", "Bearer abc.def")));
        let input = AuthenticationInput {
            scheme_name: "bearer",
            scheme: &scheme,
            scopes: &[],
            request: &req,
        };
        assert_eq!(input.http_credentials().as_deref(), Some("abc.def"));
        assert_eq!(input.api_key(), None);

        let req = request("/pets", Some(("authorization", "Basic dXNlcg==")));
        let input = AuthenticationInput { request: &req, ..input };
        assert_eq!(input.http_credentials(), None);
    }
}
