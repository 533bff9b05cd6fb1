//! Parameter declarations.
//!
//! A [`Parameter`] is only ever constructed with a legal
//! (location, style, explode) combination:
//!
//! | location | styles | explode |
//! |----------|--------|---------|
//! | path | `simple`, `label`, `matrix` | either |
//! | query | `form` | either |
//! | query | `spaceDelimited`, `pipeDelimited` | `false`, not for objects |
//! | query | `deepObject` | `true`, objects only |
//! | header | `simple` | either |
//! | cookie | `form` | either for primitives, `false` for arrays and objects |
//!
//! Anything else is a [`DocumentError`], raised at construction time.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::DocumentError;
use crate::schema::{Schema, SchemaKind};

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// A templated path segment.
    Path,
    /// The query string.
    Query,
    /// A request or response header.
    Header,
    /// A cookie.
    Cookie,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        })
    }
}

/// Serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    /// `simple`
    Simple,
    /// `label`
    Label,
    /// `matrix`
    Matrix,
    /// `form`
    Form,
    /// `spaceDelimited`
    SpaceDelimited,
    /// `pipeDelimited`
    PipeDelimited,
    /// `deepObject`
    DeepObject,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Label => "label",
            Self::Matrix => "matrix",
            Self::Form => "form",
            Self::SpaceDelimited => "spaceDelimited",
            Self::PipeDelimited => "pipeDelimited",
            Self::DeepObject => "deepObject",
        })
    }
}

/// A style together with its explode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializationMethod {
    /// The style.
    pub style: Style,
    /// Whether arrays and objects are exploded.
    pub explode: bool,
}

impl SerializationMethod {
    /// Creates a serialization method.
    pub const fn new(style: Style, explode: bool) -> Self {
        Self { style, explode }
    }

    /// The OpenAPI default for a location.
    pub const fn default_for(location: Location) -> Self {
        match location {
            Location::Path | Location::Header => Self::new(Style::Simple, false),
            Location::Query | Location::Cookie => Self::new(Style::Form, true),
        }
    }

    /// `form` with `explode: true`, the default for body encodings.
    pub const fn form() -> Self {
        Self::new(Style::Form, true)
    }
}

impl fmt::Display for SerializationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "style {} explode={}", self.style, self.explode)
    }
}

/// Value shape a schema decodes to, as far as serialization rules care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A scalar.
    Primitive,
    /// An array.
    Array,
    /// An object.
    Object,
    /// Only known once a composition branch is picked.
    Composite,
}

impl Shape {
    /// Classifies a schema.
    pub fn of(schema: &Schema) -> Self {
        match &schema.kind {
            SchemaKind::Array(_) => Self::Array,
            SchemaKind::Object(_) => Self::Object,
            SchemaKind::Primitive(_) => Self::Primitive,
            SchemaKind::Any if schema.composition.is_empty() => Self::Primitive,
            SchemaKind::Any => Self::Composite,
        }
    }
}

/// Whether `method` may serialize a value of `shape` at `location`.
pub fn is_legal(location: Location, method: SerializationMethod, shape: Shape) -> bool {
    use Style::{DeepObject, Form, Label, Matrix, PipeDelimited, Simple, SpaceDelimited};

    match (location, method.style) {
        (Location::Path, Simple | Label | Matrix) | (Location::Header, Simple) => true,
        (Location::Query, Form) => true,
        (Location::Query, SpaceDelimited | PipeDelimited) => {
            !method.explode && shape != Shape::Object
        }
        (Location::Query, DeepObject) => {
            method.explode && matches!(shape, Shape::Object | Shape::Composite)
        }
        (Location::Cookie, Form) => {
            !method.explode || matches!(shape, Shape::Primitive | Shape::Composite)
        }
        _ => false,
    }
}

/// How a parameter's value is described.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// `schema` plus serialization rules.
    Schema {
        /// The value schema.
        schema: Schema,
        /// Style and explode.
        method: SerializationMethod,
    },
    /// `content` with exactly one media type.
    Content {
        /// The media type, e.g. `application/json`.
        media_type: String,
        /// The schema of the decoded content.
        schema: Option<Schema>,
    },
}

/// A parameter of an operation or path item.
///
/// # Example
///
/// ```
/// use nomos_core::{Location, Parameter, Schema, Style};
///
/// let tags = Parameter::builder("tags", Location::Path)
///     .schema(Schema::array(Schema::string()))
///     .style(Style::Label, false)
///     .build()
///     .unwrap();
/// assert!(tags.required);
///
/// // matrix is a path style
/// let err = Parameter::builder("tags", Location::Query)
///     .schema(Schema::array(Schema::string()))
///     .style(Style::Matrix, false)
///     .build();
/// assert!(err.is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawParameter")]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where it is carried.
    pub location: Location,
    /// Whether it must be present.
    pub required: bool,
    /// Whether an empty value is acceptable.
    pub allow_empty_value: bool,
    /// Deprecation marker.
    pub deprecated: bool,
    /// Free-form description.
    pub description: Option<String>,
    /// Schema or content description.
    pub value: ParameterValue,
}

impl Parameter {
    /// Starts a builder.
    pub fn builder(name: impl Into<String>, location: Location) -> ParameterBuilder {
        ParameterBuilder::new(name, location)
    }

    /// The value schema, for both schema and content parameters.
    pub fn schema(&self) -> Option<&Schema> {
        match &self.value {
            ParameterValue::Schema { schema, .. } => Some(schema),
            ParameterValue::Content { schema, .. } => schema.as_ref(),
        }
    }

    /// The serialization method of a schema parameter.
    pub fn serialization_method(&self) -> Option<SerializationMethod> {
        match &self.value {
            ParameterValue::Schema { method, .. } => Some(*method),
            ParameterValue::Content { .. } => None,
        }
    }

    /// Whether this parameter overrides `other`: same location and name.
    ///
    /// Header names compare case-insensitively.
    pub fn same_key(&self, other: &Parameter) -> bool {
        self.location == other.location
            && match self.location {
                Location::Header => self.name.eq_ignore_ascii_case(&other.name),
                _ => self.name == other.name,
            }
    }
}

/// Builder for [`Parameter`].
#[derive(Debug)]
pub struct ParameterBuilder {
    name: String,
    location: Location,
    required: Option<bool>,
    allow_empty_value: bool,
    deprecated: bool,
    description: Option<String>,
    schema: Option<Schema>,
    style: Option<Style>,
    explode: Option<bool>,
    content: Option<(String, Option<Schema>)>,
}

impl ParameterBuilder {
    /// Creates a builder.
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
            required: None,
            allow_empty_value: false,
            deprecated: false,
            description: None,
            schema: None,
            style: None,
            explode: None,
            content: None,
        }
    }

    /// Sets the value schema.
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Describes the value through a single media type instead of a schema.
    #[must_use]
    pub fn content(mut self, media_type: impl Into<String>, schema: Option<Schema>) -> Self {
        self.content = Some((media_type.into(), schema));
        self
    }

    /// Sets style and explode.
    #[must_use]
    pub fn style(mut self, style: Style, explode: bool) -> Self {
        self.style = Some(style);
        self.explode = Some(explode);
        self
    }

    /// Sets `required`. Path parameters are always required.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Sets `allowEmptyValue`.
    #[must_use]
    pub fn allow_empty_value(mut self, allow: bool) -> Self {
        self.allow_empty_value = allow;
        self
    }

    /// Marks the parameter deprecated.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks the declaration and builds the parameter.
    pub fn build(self) -> Result<Parameter, DocumentError> {
        let Self {
            name,
            location,
            required,
            allow_empty_value,
            deprecated,
            description,
            schema,
            style,
            explode,
            content,
        } = self;

        if name.is_empty() {
            return Err(DocumentError::invalid_parameter(name, location, "name is empty"));
        }
        if location == Location::Path && required == Some(false) {
            return Err(DocumentError::invalid_parameter(
                name,
                location,
                "path parameters must be required",
            ));
        }

        let value = match (schema, content) {
            (Some(_), Some(_)) => {
                return Err(DocumentError::invalid_parameter(
                    name,
                    location,
                    "schema and content are mutually exclusive",
                ))
            }
            (None, None) => {
                return Err(DocumentError::invalid_parameter(
                    name,
                    location,
                    "either schema or content is required",
                ))
            }
            (None, Some((media_type, schema))) => ParameterValue::Content { media_type, schema },
            (Some(schema), None) => {
                let defaults = SerializationMethod::default_for(location);
                let style = style.unwrap_or(defaults.style);
                let method = SerializationMethod::new(
                    style,
                    explode.unwrap_or(style == Style::Form),
                );
                if !is_legal(location, method, Shape::of(&schema)) {
                    return Err(DocumentError::InvalidSerialization {
                        name,
                        location,
                        style: method.style,
                        explode: method.explode,
                    });
                }
                ParameterValue::Schema { schema, method }
            }
        };

        Ok(Parameter {
            name,
            location,
            required: location == Location::Path || required.unwrap_or(false),
            allow_empty_value,
            deprecated,
            description,
            value,
        })
    }
}

#[derive(Deserialize)]
struct RawMediaSchema {
    schema: Option<Schema>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParameter {
    name: String,
    #[serde(rename = "in")]
    location: Location,
    required: Option<bool>,
    #[serde(default)]
    allow_empty_value: bool,
    #[serde(default)]
    deprecated: bool,
    description: Option<String>,
    schema: Option<Schema>,
    style: Option<Style>,
    explode: Option<bool>,
    content: Option<IndexMap<String, RawMediaSchema>>,
}

impl TryFrom<RawParameter> for Parameter {
    type Error = DocumentError;

    fn try_from(raw: RawParameter) -> Result<Self, Self::Error> {
        let mut builder = ParameterBuilder::new(raw.name, raw.location);
        builder.required = raw.required;
        builder.allow_empty_value = raw.allow_empty_value;
        builder.deprecated = raw.deprecated;
        builder.description = raw.description;
        builder.schema = raw.schema;
        builder.style = raw.style;
        builder.explode = raw.explode;
        if let Some(content) = raw.content {
            if content.len() != 1 {
                return Err(DocumentError::invalid_parameter(
                    builder.name,
                    builder.location,
                    format!("content must have exactly one media type, found {}", content.len()),
                ));
            }
            builder.content = content
                .into_iter()
                .next()
                .map(|(media_type, media)| (media_type, media.schema));
        }
        builder.build()
    }
}

/// Builds a header parameter from an OpenAPI header object keyed by `name`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawHeader {
    #[serde(default)]
    required: bool,
    #[serde(default)]
    deprecated: bool,
    description: Option<String>,
    schema: Option<Schema>,
    explode: Option<bool>,
    content: Option<IndexMap<String, RawMediaSchema>>,
}

impl RawHeader {
    pub(crate) fn into_parameter(self, name: String) -> Result<Parameter, DocumentError> {
        RawParameter {
            name,
            location: Location::Header,
            required: Some(self.required),
            allow_empty_value: false,
            deprecated: self.deprecated,
            description: self.description,
            schema: self.schema,
            style: Some(Style::Simple),
            explode: self.explode,
            content: self.content,
        }
        .try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_per_location() {
        let query = Parameter::builder("q", Location::Query)
            .schema(Schema::string())
            .build()
            .unwrap();
        assert_eq!(
            query.serialization_method(),
            Some(SerializationMethod::new(Style::Form, true))
        );

        let header = Parameter::builder("X-Id", Location::Header)
            .schema(Schema::string())
            .build()
            .unwrap();
        assert_eq!(
            header.serialization_method(),
            Some(SerializationMethod::new(Style::Simple, false))
        );
    }

    #[test]
    fn test_path_parameter_is_required() {
        let id = Parameter::builder("id", Location::Path)
            .schema(Schema::integer())
            .build()
            .unwrap();
        assert!(id.required);

        let err = Parameter::builder("id", Location::Path)
            .schema(Schema::integer())
            .required(false)
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_illegal_combinations_rejected() {
        let cases = [
            (Location::Header, Style::Form, false, Schema::string()),
            (Location::Query, Style::SpaceDelimited, true, Schema::array(Schema::string())),
            (Location::Query, Style::PipeDelimited, false, Schema::object()),
            (Location::Query, Style::DeepObject, true, Schema::array(Schema::string())),
            (Location::Query, Style::DeepObject, false, Schema::object()),
            (Location::Cookie, Style::Form, true, Schema::array(Schema::string())),
            (Location::Path, Style::Form, false, Schema::string()),
        ];
        for (location, style, explode, schema) in cases {
            let result = Parameter::builder("p", location)
                .schema(schema)
                .style(style, explode)
                .build();
            assert!(
                matches!(result, Err(DocumentError::InvalidSerialization { .. })),
                "{location} {style} explode={explode} should be rejected"
            );
        }
    }

    #[test]
    fn test_cookie_array_requires_explode_false() {
        let ok = Parameter::builder("ids", Location::Cookie)
            .schema(Schema::array(Schema::integer()))
            .style(Style::Form, false)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_schema_and_content_are_exclusive() {
        let err = Parameter::builder("p", Location::Query)
            .schema(Schema::string())
            .content("application/json", None)
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_deserialize_parameter() {
        let param: Parameter = serde_json::from_value(json!({
            "name": "filter",
            "in": "query",
            "style": "deepObject",
            "explode": true,
            "schema": { "type": "object" }
        }))
        .unwrap();
        assert_eq!(
            param.serialization_method(),
            Some(SerializationMethod::new(Style::DeepObject, true))
        );
        assert!(!param.required);
    }

    #[test]
    fn test_deserialize_form_style_defaults_explode() {
        let param: Parameter = serde_json::from_value(json!({
            "name": "status",
            "in": "query",
            "style": "form",
            "schema": { "type": "array", "items": { "type": "string" } }
        }))
        .unwrap();
        assert_eq!(param.serialization_method().map(|m| m.explode), Some(true));
    }

    #[test]
    fn test_deserialize_content_parameter() {
        let param: Parameter = serde_json::from_value(json!({
            "name": "coords",
            "in": "query",
            "content": { "application/json": { "schema": { "type": "object" } } }
        }))
        .unwrap();
        assert!(matches!(param.value, ParameterValue::Content { ref media_type, .. } if media_type == "application/json"));

        let err = serde_json::from_value::<Parameter>(json!({
            "name": "coords",
            "in": "query",
            "content": { "application/json": {}, "text/plain": {} }
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_same_key_headers_case_insensitive() {
        let a = Parameter::builder("X-Trace", Location::Header)
            .schema(Schema::string())
            .build()
            .unwrap();
        let b = Parameter::builder("x-trace", Location::Header)
            .schema(Schema::string())
            .build()
            .unwrap();
        assert!(a.same_key(&b));
    }
}
