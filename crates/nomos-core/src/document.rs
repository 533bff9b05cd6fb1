//! Operations, bodies and the document root.
//!
//! The document is immutable once built. Path items and operations are held
//! behind [`Arc`] so a [`Route`](crate::Route) can point at them without
//! borrowing from the document.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use http::Method;
//! use nomos_core::{Document, Route};
//! use serde_json::json;
//!
//! let document: Document = serde_json::from_value(json!({
//!     "openapi": "3.0.3",
//!     "paths": {
//!         "/pets/{petId}": {
//!             "get": {
//!                 "operationId": "getPet",
//!                 "parameters": [
//!                     { "name": "petId", "in": "path", "required": true,
//!                       "schema": { "type": "integer", "format": "int64" } }
//!                 ],
//!                 "responses": { "200": { "description": "ok" } }
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let route = Route::resolve(&Arc::new(document), &Method::GET, "/pets/{petId}").unwrap();
//! assert_eq!(route.operation.operation_id.as_deref(), Some("getPet"));
//! ```

use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::error::DocumentError;
use crate::parameter::{Parameter, RawHeader, SerializationMethod, Style};
use crate::schema::Schema;
use crate::security::{SecurityRequirement, SecurityScheme};

/// A server entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Server {
    /// Base URL.
    pub url: String,
    /// Free-form description.
    pub description: Option<String>,
}

impl Server {
    /// Creates a server entry.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }
}

/// Per-property serialization override for urlencoded and multipart bodies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    /// Content type of a multipart part.
    pub content_type: Option<String>,
    /// Style for urlencoded properties.
    pub style: Option<Style>,
    /// Explode for urlencoded properties.
    pub explode: Option<bool>,
    /// `allowReserved`.
    #[serde(default)]
    pub allow_reserved: bool,
}

impl Encoding {
    /// Style and explode, defaulting to `form` with `explode: true`.
    pub fn serialization_method(&self) -> SerializationMethod {
        let style = self.style.unwrap_or(Style::Form);
        SerializationMethod::new(style, self.explode.unwrap_or(style == Style::Form))
    }
}

/// Schema and encodings for one media type.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MediaType {
    /// Schema of the decoded body.
    pub schema: Option<Schema>,
    /// Per-property encodings.
    #[serde(default)]
    pub encoding: IndexMap<String, Encoding>,
}

impl MediaType {
    /// A media type described by `schema`.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Some(schema),
            encoding: IndexMap::new(),
        }
    }

    /// Adds a property encoding.
    #[must_use]
    pub fn encoding(mut self, property: impl Into<String>, encoding: Encoding) -> Self {
        self.encoding.insert(property.into(), encoding);
        self
    }
}

/// Media type to [`MediaType`] map.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct Content(IndexMap<String, MediaType>);

impl Content {
    /// Creates an empty content map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, media_type: impl Into<String>, media: MediaType) -> Self {
        self.0.insert(media_type.into(), media);
        self
    }

    /// Whether no media type is declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over declared media types.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, MediaType> {
        self.0.iter()
    }

    /// Finds the entry for a `Content-Type` value.
    ///
    /// Tries the full value, then the value without parameters, then
    /// `type/*`, then `*/*`. An empty value only matches `*/*`.
    pub fn get(&self, content_type: &str) -> Option<(&str, &MediaType)> {
        if content_type.is_empty() {
            return self.lookup("*/*");
        }
        if let Some(found) = self.lookup(content_type) {
            return Some(found);
        }
        let essence = content_type
            .split_once(';')
            .map_or(content_type, |(essence, _)| essence)
            .trim();
        if let Some(found) = self.lookup(essence) {
            return Some(found);
        }
        essence
            .split_once('/')
            .and_then(|(ty, _)| self.lookup(&format!("{ty}/*")))
            .or_else(|| self.lookup("*/*"))
    }

    fn lookup(&self, key: &str) -> Option<(&str, &MediaType)> {
        self.0
            .iter()
            .find(|(media_type, _)| media_type.eq_ignore_ascii_case(key))
            .map(|(media_type, media)| (media_type.as_str(), media))
    }
}

/// A request body declaration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RequestBody {
    /// Free-form description.
    pub description: Option<String>,
    /// Whether a body must be sent.
    #[serde(default)]
    pub required: bool,
    /// Accepted media types.
    #[serde(default)]
    pub content: Content,
}

impl RequestBody {
    /// A body accepting the given content.
    pub fn new(content: Content) -> Self {
        Self {
            description: None,
            required: false,
            content,
        }
    }

    /// Marks the body required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A response declaration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Response {
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Declared headers, as header parameters.
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: IndexMap<String, Parameter>,
    /// Media types.
    #[serde(default)]
    pub content: Content,
}

impl Response {
    /// A response with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Sets the content.
    #[must_use]
    pub fn content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    /// Adds a header. The parameter is expected to be in [`Location::Header`](crate::Location::Header).
    #[must_use]
    pub fn header(mut self, header: Parameter) -> Self {
        self.headers.insert(header.name.clone(), header);
        self
    }
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<IndexMap<String, Parameter>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, RawHeader>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, header)| {
            header
                .into_parameter(name.clone())
                .map(|parameter| (name, parameter))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Responses keyed by status code, status range (`2XX`) or `default`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct Responses(IndexMap<String, Response>);

impl Responses {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a response.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, response: Response) -> Self {
        self.0.insert(key.into(), response);
        self
    }

    /// Number of declared responses.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The response for an exact status, then for its range (`4XX`).
    pub fn status(&self, status: u16) -> Option<&Response> {
        self.0.get(&status.to_string()).or_else(|| {
            if (100..600).contains(&status) {
                self.0.get(&format!("{}XX", status / 100))
            } else {
                None
            }
        })
    }

    /// The `default` response.
    pub fn default_response(&self) -> Option<&Response> {
        self.0.get("default")
    }
}

/// An operation.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// `operationId`.
    pub operation_id: Option<String>,
    /// Summary line.
    pub summary: Option<String>,
    /// Operation-level parameters.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Request body.
    pub request_body: Option<RequestBody>,
    /// Responses.
    #[serde(default)]
    pub responses: Responses,
    /// Operation-level security. `None` falls back to the document's.
    pub security: Option<Vec<SecurityRequirement>>,
    /// Deprecation marker.
    #[serde(default)]
    pub deprecated: bool,
}

impl Operation {
    /// Starts a builder.
    pub fn builder() -> OperationBuilder {
        OperationBuilder::default()
    }

    /// Looks up an operation-level parameter overriding `parameter`.
    pub fn overrides(&self, parameter: &Parameter) -> bool {
        self.parameters.iter().any(|own| own.same_key(parameter))
    }
}

/// Builder for [`Operation`].
#[derive(Debug, Default)]
pub struct OperationBuilder {
    operation: Operation,
}

impl OperationBuilder {
    /// Sets `operationId`.
    #[must_use]
    pub fn id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation.operation_id = Some(operation_id.into());
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.operation.parameters.push(parameter);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn request_body(mut self, body: RequestBody) -> Self {
        self.operation.request_body = Some(body);
        self
    }

    /// Adds a response.
    #[must_use]
    pub fn response(mut self, key: impl Into<String>, response: Response) -> Self {
        self.operation.responses = self.operation.responses.with(key, response);
        self
    }

    /// Sets the security alternatives.
    #[must_use]
    pub fn security(mut self, requirements: Vec<SecurityRequirement>) -> Self {
        self.operation.security = Some(requirements);
        self
    }

    /// Builds the operation.
    pub fn build(self) -> Operation {
        self.operation
    }
}

/// A path item: shared parameters plus operations by method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathItem {
    /// Parameters shared by every operation.
    pub parameters: Vec<Parameter>,
    operations: IndexMap<Method, Arc<Operation>>,
}

impl PathItem {
    /// Creates an empty path item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shared parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Adds an operation.
    #[must_use]
    pub fn operation(mut self, method: Method, operation: Operation) -> Self {
        self.operations.insert(method, Arc::new(operation));
        self
    }

    /// The operation for a method.
    pub fn get(&self, method: &Method) -> Option<&Arc<Operation>> {
        self.operations.get(method)
    }

    /// Iterates over operations by method.
    pub fn operations(&self) -> impl Iterator<Item = (&Method, &Arc<Operation>)> {
        self.operations.iter()
    }
}

#[derive(Deserialize)]
struct RawPathItem {
    #[serde(default)]
    parameters: Vec<Parameter>,
    get: Option<Operation>,
    put: Option<Operation>,
    post: Option<Operation>,
    delete: Option<Operation>,
    options: Option<Operation>,
    head: Option<Operation>,
    patch: Option<Operation>,
    trace: Option<Operation>,
}

impl<'de> Deserialize<'de> for PathItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawPathItem::deserialize(deserializer)?;
        let mut item = PathItem {
            parameters: raw.parameters,
            operations: IndexMap::new(),
        };
        let methods = [
            (Method::GET, raw.get),
            (Method::PUT, raw.put),
            (Method::POST, raw.post),
            (Method::DELETE, raw.delete),
            (Method::OPTIONS, raw.options),
            (Method::HEAD, raw.head),
            (Method::PATCH, raw.patch),
            (Method::TRACE, raw.trace),
        ];
        for (method, operation) in methods {
            if let Some(operation) = operation {
                item.operations.insert(method, Arc::new(operation));
            }
        }
        Ok(item)
    }
}

/// The resolved document root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Path templates to path items.
    pub paths: IndexMap<String, Arc<PathItem>>,
    /// Document-wide security alternatives.
    pub security: Vec<SecurityRequirement>,
    /// Declared security schemes.
    pub security_schemes: IndexMap<String, SecurityScheme>,
    /// Servers.
    pub servers: Vec<Server>,
}

impl Document {
    /// Starts a builder.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// Looks up a declared security scheme.
    pub fn security_scheme(&self, name: &str) -> Result<&SecurityScheme, DocumentError> {
        self.security_schemes
            .get(name)
            .ok_or_else(|| DocumentError::UndeclaredSecurityScheme(name.to_string()))
    }
}

/// Builder for [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Adds a path item.
    #[must_use]
    pub fn path(mut self, template: impl Into<String>, item: PathItem) -> Self {
        self.document.paths.insert(template.into(), Arc::new(item));
        self
    }

    /// Adds a document-wide security alternative.
    #[must_use]
    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.document.security.push(requirement);
        self
    }

    /// Declares a security scheme.
    #[must_use]
    pub fn security_scheme(mut self, name: impl Into<String>, scheme: SecurityScheme) -> Self {
        self.document.security_schemes.insert(name.into(), scheme);
        self
    }

    /// Adds a server.
    #[must_use]
    pub fn server(mut self, server: Server) -> Self {
        self.document.servers.push(server);
        self
    }

    /// Builds the document.
    pub fn build(self) -> Document {
        self.document
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawComponents {
    security_schemes: IndexMap<String, SecurityScheme>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    paths: IndexMap<String, PathItem>,
    #[serde(default)]
    security: Vec<SecurityRequirement>,
    #[serde(default)]
    components: RawComponents,
    #[serde(default)]
    servers: Vec<Server>,
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawDocument::deserialize(deserializer)?;
        Ok(Document {
            paths: raw
                .paths
                .into_iter()
                .map(|(template, item)| (template, Arc::new(item)))
                .collect(),
            security: raw.security,
            security_schemes: raw.components.security_schemes,
            servers: raw.servers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Location;
    use serde_json::json;

    #[test]
    fn test_content_lookup_order() {
        let content = Content::new()
            .with("application/json", MediaType::default())
            .with("text/*", MediaType::default())
            .with("*/*", MediaType::default());

        assert_eq!(content.get("application/json").map(|(k, _)| k), Some("application/json"));
        assert_eq!(
            content.get("application/json; charset=utf-8").map(|(k, _)| k),
            Some("application/json")
        );
        assert_eq!(content.get("text/csv").map(|(k, _)| k), Some("text/*"));
        assert_eq!(content.get("image/png").map(|(k, _)| k), Some("*/*"));
        assert_eq!(content.get("").map(|(k, _)| k), Some("*/*"));
    }

    #[test]
    fn test_content_lookup_without_wildcard() {
        let content = Content::new().with("application/json", MediaType::default());
        assert!(content.get("").is_none());
        assert!(content.get("text/plain").is_none());
        assert!(content.get("Application/JSON").is_some());
    }

    #[test]
    fn test_responses_status_range_and_default() {
        let responses = Responses::new()
            .with("200", Response::new("ok"))
            .with("4XX", Response::new("client error"))
            .with("default", Response::new("fallback"));

        assert_eq!(responses.status(200).map(|r| r.description.as_str()), Some("ok"));
        assert_eq!(responses.status(404).map(|r| r.description.as_str()), Some("client error"));
        assert!(responses.status(500).is_none());
        assert_eq!(responses.default_response().map(|r| r.description.as_str()), Some("fallback"));
    }

    #[test]
    fn test_encoding_defaults_to_form_explode() {
        assert_eq!(Encoding::default().serialization_method(), SerializationMethod::form());
        let piped = Encoding {
            style: Some(Style::PipeDelimited),
            ..Encoding::default()
        };
        assert_eq!(
            piped.serialization_method(),
            SerializationMethod::new(Style::PipeDelimited, false)
        );
    }

    #[test]
    fn test_response_headers_become_header_parameters() {
        let response: Response = serde_json::from_value(json!({
            "description": "ok",
            "headers": {
                "X-Rate-Limit": { "required": true, "schema": { "type": "integer" } }
            }
        }))
        .unwrap();
        let header = &response.headers["X-Rate-Limit"];
        assert_eq!(header.location, Location::Header);
        assert!(header.required);
    }

    #[test]
    fn test_document_deserialize_components() {
        let document: Document = serde_json::from_value(json!({
            "openapi": "3.0.3",
            "components": {
                "securitySchemes": {
                    "api_key": { "type": "apiKey", "name": "X-API-Key", "in": "header" }
                }
            },
            "security": [{ "api_key": [] }],
            "paths": {
                "/pets": {
                    "get": { "responses": { "200": { "description": "ok" } } },
                    "post": { "responses": { "201": { "description": "created" } } }
                }
            }
        }))
        .unwrap();

        assert!(document.security_scheme("api_key").is_ok());
        assert!(matches!(
            document.security_scheme("oauth"),
            Err(DocumentError::UndeclaredSecurityScheme(_))
        ));
        assert_eq!(document.security.len(), 1);
        let item = &document.paths["/pets"];
        assert!(item.get(&Method::GET).is_some());
        assert!(item.get(&Method::DELETE).is_none());
        assert_eq!(item.operations().count(), 2);
    }

    #[test]
    fn test_operation_overrides() {
        let shared = Parameter::builder("limit", Location::Query)
            .schema(Schema::integer())
            .build()
            .unwrap();
        let operation = Operation::builder()
            .parameter(
                Parameter::builder("limit", Location::Query)
                    .schema(Schema::integer().default_value(json!(10)))
                    .build()
                    .unwrap(),
            )
            .build();
        assert!(operation.overrides(&shared));
    }
}
