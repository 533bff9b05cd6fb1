//! Security schemes and requirements.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Where an API key is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    /// Query string.
    Query,
    /// Header.
    Header,
    /// Cookie.
    Cookie,
}

/// A declared security scheme.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityScheme {
    /// `apiKey`.
    #[serde(rename = "apiKey")]
    ApiKey {
        /// Header, query or cookie name.
        name: String,
        /// Where the key is carried.
        #[serde(rename = "in")]
        location: ApiKeyLocation,
    },
    /// `http` (basic, bearer, ...).
    #[serde(rename = "http")]
    Http {
        /// Authorization scheme, e.g. `bearer`.
        scheme: String,
        /// Token format hint.
        #[serde(rename = "bearerFormat")]
        bearer_format: Option<String>,
    },
    /// `oauth2`. Flows are kept opaque.
    #[serde(rename = "oauth2")]
    OAuth2 {
        /// Declared flows.
        #[serde(default)]
        flows: Value,
    },
    /// `openIdConnect`.
    #[serde(rename = "openIdConnect")]
    OpenIdConnect {
        /// Discovery URL.
        #[serde(rename = "openIdConnectUrl")]
        url: String,
    },
    /// `mutualTLS`.
    #[serde(rename = "mutualTLS")]
    MutualTls,
}

impl SecurityScheme {
    /// The OpenAPI type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ApiKey { .. } => "apiKey",
            Self::Http { .. } => "http",
            Self::OAuth2 { .. } => "oauth2",
            Self::OpenIdConnect { .. } => "openIdConnect",
            Self::MutualTls => "mutualTLS",
        }
    }
}

/// One security alternative: every named scheme must be satisfied.
///
/// An empty requirement means anonymous access is acceptable.
///
/// ```
/// use nomos_core::SecurityRequirement;
///
/// let requirement = SecurityRequirement::new()
///     .scheme("oauth", ["pets:read"])
///     .scheme("api_key", [] as [&str; 0]);
/// assert_eq!(requirement.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct SecurityRequirement(IndexMap<String, Vec<String>>);

impl SecurityRequirement {
    /// Creates an empty requirement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scheme with its scopes.
    #[must_use]
    pub fn scheme<I, S>(mut self, name: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(name.into(), scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Number of schemes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the requirement is anonymous.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over scheme names and scopes, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, scopes)| (name.as_str(), scopes.as_slice()))
    }
}
