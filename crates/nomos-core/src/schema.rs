//! Resolved schema tree.
//!
//! A [`Schema`] carries the attributes that apply to any shape (nullability,
//! defaults, readOnly/writeOnly, enum, discriminator) plus exactly one
//! [`SchemaKind`] and an independent [`Composition`]. Validation applies the
//! shape constraints first and then, separately, the composition.
//!
//! ```text
//! Schema
//!  ├── kind: SchemaKind
//!  │     ├── Any
//!  │     ├── Primitive(String | Number | Integer | Boolean | Null)
//!  │     ├── Array(items, min/max, unique)
//!  │     └── Object(properties, required, additionalProperties)
//!  └── composition: allOf / anyOf / oneOf / not
//! ```
//!
//! Schemas deserialize from resolved JSON. Construction rejects leftover
//! `$ref`s, invalid regular expressions and keywords of two different shapes
//! on the same node.

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::DocumentError;

/// Prefix stripped from discriminator mapping targets.
const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// A resolved schema node.
///
/// # Example
///
/// ```
/// use nomos_core::{AdditionalProperties, Schema};
///
/// let pet = Schema::object()
///     .required_property("name", Schema::string().min_length(1))
///     .property("id", Schema::integer().format("int64").read_only())
///     .additional_properties(AdditionalProperties::Forbidden)
///     .named("Pet");
///
/// assert_eq!(pet.name.as_deref(), Some("Pet"));
/// assert!(pet.property_schema("id").unwrap().read_only);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct Schema {
    /// Component name, used to resolve discriminator values by convention.
    pub name: Option<String>,
    /// Human-readable title.
    pub title: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Shape constraints.
    pub kind: SchemaKind,
    /// Whether `type` was declared. Untyped schemas apply their constraints
    /// only to values of the matching JSON type.
    pub type_declared: bool,
    /// `allOf` / `anyOf` / `oneOf` / `not`.
    pub composition: Composition,
    /// Whether `null` is accepted.
    pub nullable: bool,
    /// Value injected when the property is absent.
    pub default: Option<Value>,
    /// Property may only appear in responses.
    pub read_only: bool,
    /// Property may only appear in requests.
    pub write_only: bool,
    /// Allowed values (`enum`, or `const` as a single-element list).
    pub enum_values: Option<Vec<Value>>,
    /// Branch selector for `oneOf`/`anyOf`.
    pub discriminator: Option<Discriminator>,
}

/// The shape a value must have.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SchemaKind {
    /// No shape constraint.
    #[default]
    Any,
    /// A scalar.
    Primitive(Primitive),
    /// A JSON array.
    Array(ArraySchema),
    /// A JSON object.
    Object(ObjectSchema),
}

/// Scalar types with their type-specific constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// `type: string`
    String(StringConstraints),
    /// `type: number`
    Number(NumberConstraints),
    /// `type: integer`
    Integer(NumberConstraints),
    /// `type: boolean`
    Boolean,
    /// `type: null`
    Null,
}

impl Primitive {
    /// The OpenAPI type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Integer(_) => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// Constraints on strings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringConstraints {
    /// `format`, e.g. `date-time` or `binary`.
    pub format: Option<String>,
    /// Minimum length in characters.
    pub min_length: Option<u64>,
    /// Maximum length in characters.
    pub max_length: Option<u64>,
    /// Precompiled `pattern`.
    pub pattern: Option<Pattern>,
}

/// Constraints on numbers and integers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumberConstraints {
    /// `format`, e.g. `int32`, `int64`, `float`.
    pub format: Option<String>,
    /// Lower bound.
    pub minimum: Option<Bound>,
    /// Upper bound.
    pub maximum: Option<Bound>,
    /// `multipleOf`.
    pub multiple_of: Option<f64>,
}

/// A numeric bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    /// The limit.
    pub value: f64,
    /// Whether the limit itself is excluded.
    pub exclusive: bool,
}

impl Bound {
    /// An inclusive bound.
    pub const fn inclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: false,
        }
    }

    /// An exclusive bound.
    pub const fn exclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: true,
        }
    }
}

/// Constraints on arrays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArraySchema {
    /// Schema of every element.
    pub items: Option<Box<Schema>>,
    /// `minItems`.
    pub min_items: Option<u64>,
    /// `maxItems`.
    pub max_items: Option<u64>,
    /// `uniqueItems`.
    pub unique_items: bool,
}

/// Constraints on objects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    /// Declared properties.
    pub properties: IndexMap<String, Schema>,
    /// Names that must be present.
    pub required: Vec<String>,
    /// Policy for undeclared properties.
    pub additional_properties: AdditionalProperties,
    /// `minProperties`.
    pub min_properties: Option<u64>,
    /// `maxProperties`.
    pub max_properties: Option<u64>,
}

/// What to do with properties that are not declared.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdditionalProperties {
    /// Not stated in the document; undeclared properties pass validation.
    #[default]
    Unspecified,
    /// `additionalProperties: true`.
    Allowed,
    /// `additionalProperties: false`.
    Forbidden,
    /// Undeclared properties must match this schema.
    Schema(Box<Schema>),
}

/// Schema composition keywords.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composition {
    /// Every child must match.
    pub all_of: Vec<Schema>,
    /// At least one child must match.
    pub any_of: Vec<Schema>,
    /// Exactly one child must match.
    pub one_of: Vec<Schema>,
    /// The child must not match.
    pub not: Option<Box<Schema>>,
}

impl Composition {
    /// Whether no composition keyword is present.
    pub fn is_empty(&self) -> bool {
        self.all_of.is_empty() && self.any_of.is_empty() && self.one_of.is_empty() && self.not.is_none()
    }

    /// Iterates over `allOf`, `anyOf` and `oneOf` children (not `not`).
    pub fn branches(&self) -> impl Iterator<Item = &Schema> {
        self.all_of
            .iter()
            .chain(self.any_of.iter())
            .chain(self.one_of.iter())
    }
}

/// Selects a `oneOf`/`anyOf` branch from a property value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    /// Name of the selecting property.
    pub property_name: String,
    /// Explicit value to schema reference mapping.
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
}

impl Discriminator {
    /// Creates a discriminator without explicit mapping.
    pub fn new(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            mapping: IndexMap::new(),
        }
    }

    /// Adds an explicit mapping entry.
    #[must_use]
    pub fn map(mut self, value: impl Into<String>, target: impl Into<String>) -> Self {
        self.mapping.insert(value.into(), target.into());
        self
    }

    /// Resolves a property value to the name of the schema it selects.
    ///
    /// Without a mapping entry the value itself is the schema name.
    ///
    /// ```
    /// use nomos_core::Discriminator;
    ///
    /// let d = Discriminator::new("petType").map("kitty", "#/components/schemas/Cat");
    /// assert_eq!(d.resolve("kitty"), "Cat");
    /// assert_eq!(d.resolve("Dog"), "Dog");
    /// ```
    pub fn resolve<'a>(&'a self, value: &'a str) -> &'a str {
        match self.mapping.get(value) {
            Some(target) => target
                .strip_prefix(COMPONENT_SCHEMA_PREFIX)
                .or_else(|| target.rsplit_once('/').map(|(_, name)| name))
                .unwrap_or(target),
            None => value,
        }
    }
}

/// A precompiled `pattern`.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles a pattern.
    pub fn new(source: &str) -> Result<Self, DocumentError> {
        Regex::new(source)
            .map(Self)
            .map_err(|e| DocumentError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::with_kind(SchemaKind::Any, false)
    }
}

impl Schema {
    fn with_kind(kind: SchemaKind, type_declared: bool) -> Self {
        Self {
            name: None,
            title: None,
            description: None,
            kind,
            type_declared,
            composition: Composition::default(),
            nullable: false,
            default: None,
            read_only: false,
            write_only: false,
            enum_values: None,
            discriminator: None,
        }
    }

    /// A schema accepting anything.
    pub fn any() -> Self {
        Self::default()
    }

    /// `type: string`.
    pub fn string() -> Self {
        Self::with_kind(
            SchemaKind::Primitive(Primitive::String(StringConstraints::default())),
            true,
        )
    }

    /// `type: number`.
    pub fn number() -> Self {
        Self::with_kind(
            SchemaKind::Primitive(Primitive::Number(NumberConstraints::default())),
            true,
        )
    }

    /// `type: integer`.
    pub fn integer() -> Self {
        Self::with_kind(
            SchemaKind::Primitive(Primitive::Integer(NumberConstraints::default())),
            true,
        )
    }

    /// `type: boolean`.
    pub fn boolean() -> Self {
        Self::with_kind(SchemaKind::Primitive(Primitive::Boolean), true)
    }

    /// `type: null`.
    pub fn null() -> Self {
        Self::with_kind(SchemaKind::Primitive(Primitive::Null), true)
    }

    /// `type: array` with the given items.
    pub fn array(items: Schema) -> Self {
        Self::with_kind(
            SchemaKind::Array(ArraySchema {
                items: Some(Box::new(items)),
                ..ArraySchema::default()
            }),
            true,
        )
    }

    /// `type: object` without properties.
    pub fn object() -> Self {
        Self::with_kind(SchemaKind::Object(ObjectSchema::default()), true)
    }

    /// A schema made only of `oneOf` branches.
    pub fn one_of(branches: Vec<Schema>) -> Self {
        let mut schema = Self::any();
        schema.composition.one_of = branches;
        schema
    }

    /// A schema made only of `anyOf` branches.
    pub fn any_of(branches: Vec<Schema>) -> Self {
        let mut schema = Self::any();
        schema.composition.any_of = branches;
        schema
    }

    /// A schema made only of `allOf` branches.
    pub fn all_of(branches: Vec<Schema>) -> Self {
        let mut schema = Self::any();
        schema.composition.all_of = branches;
        schema
    }

    /// A schema that matches whatever `schema` rejects.
    pub fn not(schema: Schema) -> Self {
        let mut negated = Self::any();
        negated.composition.not = Some(Box::new(schema));
        negated
    }

    /// Sets the component name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the schema nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the schema readOnly.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Marks the schema writeOnly.
    #[must_use]
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// Restricts values to the given list.
    #[must_use]
    pub fn enumeration(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Sets the discriminator.
    #[must_use]
    pub fn discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    /// Sets `format` on string, number and integer schemas.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        match &mut self.kind {
            SchemaKind::Primitive(Primitive::String(c)) => c.format = Some(format.into()),
            SchemaKind::Primitive(Primitive::Number(c) | Primitive::Integer(c)) => {
                c.format = Some(format.into());
            }
            _ => {}
        }
        self
    }

    /// Sets `minLength` on a string schema.
    #[must_use]
    pub fn min_length(mut self, min: u64) -> Self {
        if let SchemaKind::Primitive(Primitive::String(c)) = &mut self.kind {
            c.min_length = Some(min);
        }
        self
    }

    /// Sets `maxLength` on a string schema.
    #[must_use]
    pub fn max_length(mut self, max: u64) -> Self {
        if let SchemaKind::Primitive(Primitive::String(c)) = &mut self.kind {
            c.max_length = Some(max);
        }
        self
    }

    /// Sets `pattern` on a string schema.
    pub fn pattern(mut self, source: &str) -> Result<Self, DocumentError> {
        if let SchemaKind::Primitive(Primitive::String(c)) = &mut self.kind {
            c.pattern = Some(Pattern::new(source)?);
        }
        Ok(self)
    }

    /// Sets the lower bound on a numeric schema.
    #[must_use]
    pub fn minimum(mut self, bound: Bound) -> Self {
        if let Some(c) = self.numeric_mut() {
            c.minimum = Some(bound);
        }
        self
    }

    /// Sets the upper bound on a numeric schema.
    #[must_use]
    pub fn maximum(mut self, bound: Bound) -> Self {
        if let Some(c) = self.numeric_mut() {
            c.maximum = Some(bound);
        }
        self
    }

    /// Sets `multipleOf` on a numeric schema.
    #[must_use]
    pub fn multiple_of(mut self, divisor: f64) -> Self {
        if let Some(c) = self.numeric_mut() {
            c.multiple_of = Some(divisor);
        }
        self
    }

    /// Sets `minItems` on an array schema.
    #[must_use]
    pub fn min_items(mut self, min: u64) -> Self {
        if let SchemaKind::Array(a) = &mut self.kind {
            a.min_items = Some(min);
        }
        self
    }

    /// Sets `maxItems` on an array schema.
    #[must_use]
    pub fn max_items(mut self, max: u64) -> Self {
        if let SchemaKind::Array(a) = &mut self.kind {
            a.max_items = Some(max);
        }
        self
    }

    /// Sets `uniqueItems` on an array schema.
    #[must_use]
    pub fn unique_items(mut self) -> Self {
        if let SchemaKind::Array(a) = &mut self.kind {
            a.unique_items = true;
        }
        self
    }

    /// Adds an optional property to an object schema.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let SchemaKind::Object(o) = &mut self.kind {
            o.properties.insert(name.into(), schema);
        }
        self
    }

    /// Adds a required property to an object schema.
    #[must_use]
    pub fn required_property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let SchemaKind::Object(o) = &mut self.kind {
            let name = name.into();
            o.required.push(name.clone());
            o.properties.insert(name, schema);
        }
        self
    }

    /// Sets the policy for undeclared properties on an object schema.
    #[must_use]
    pub fn additional_properties(mut self, policy: AdditionalProperties) -> Self {
        if let SchemaKind::Object(o) = &mut self.kind {
            o.additional_properties = policy;
        }
        self
    }

    /// Adds `allOf` branches.
    #[must_use]
    pub fn with_all_of(mut self, branches: Vec<Schema>) -> Self {
        self.composition.all_of.extend(branches);
        self
    }

    /// Adds `oneOf` branches.
    #[must_use]
    pub fn with_one_of(mut self, branches: Vec<Schema>) -> Self {
        self.composition.one_of.extend(branches);
        self
    }

    fn numeric_mut(&mut self) -> Option<&mut NumberConstraints> {
        match &mut self.kind {
            SchemaKind::Primitive(Primitive::Number(c) | Primitive::Integer(c)) => Some(c),
            _ => None,
        }
    }

    /// The OpenAPI type name, if the shape is known.
    pub fn type_name(&self) -> Option<&'static str> {
        match &self.kind {
            SchemaKind::Any => None,
            SchemaKind::Primitive(p) => Some(p.type_name()),
            SchemaKind::Array(_) => Some("array"),
            SchemaKind::Object(_) => Some("object"),
        }
    }

    /// The declared `format`, if any.
    pub fn format_name(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Primitive(Primitive::String(c)) => c.format.as_deref(),
            SchemaKind::Primitive(Primitive::Number(c) | Primitive::Integer(c)) => {
                c.format.as_deref()
            }
            _ => None,
        }
    }

    /// Whether this is `type: string, format: binary`.
    pub fn is_binary(&self) -> bool {
        matches!(
            &self.kind,
            SchemaKind::Primitive(Primitive::String(c)) if c.format.as_deref() == Some("binary")
        )
    }

    /// Object constraints, if this is an object schema.
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Array constraints, if this is an array schema.
    pub fn as_array(&self) -> Option<&ArraySchema> {
        match &self.kind {
            SchemaKind::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Looks up a declared property, including those declared by composition branches.
    pub fn property_schema(&self, name: &str) -> Option<&Schema> {
        self.as_object()
            .and_then(|o| o.properties.get(name))
            .or_else(|| {
                self.composition
                    .branches()
                    .find_map(|branch| branch.property_schema(name))
            })
    }

    /// Whether a property name is declared here or in any composition branch.
    pub fn declares_property(&self, name: &str) -> bool {
        self.property_schema(name).is_some()
    }

    /// The default to inject for an absent value.
    ///
    /// Falls back to the first `allOf` branch that declares one; when several
    /// branches disagree the first in declaration order wins.
    pub fn effective_default(&self) -> Option<&Value> {
        self.default.as_ref().or_else(|| {
            self.composition
                .all_of
                .iter()
                .find_map(Schema::effective_default)
        })
    }
}

// ---------------------------------------------------------------------------
// Deserialization
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum RawType {
    Single(String),
    Multiple(Vec<String>),
}

// Numbers inside untagged enums lose their value under `arbitrary_precision`,
// so the two-form keywords below are read as plain values first.
enum RawExclusive {
    Flag(bool),
    Limit(f64),
}

impl RawExclusive {
    fn from_value(keyword: &str, value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Bool(flag) => Ok(Self::Flag(flag)),
            Value::Number(n) => n.as_f64().map(Self::Limit).ok_or_else(|| {
                DocumentError::invalid_schema(format!("{keyword} {n} is not representable"))
            }),
            other => Err(DocumentError::invalid_schema(format!(
                "{keyword} must be a boolean or a number, got {other}"
            ))),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawSchema {
    #[serde(rename = "$ref")]
    reference: Option<String>,
    #[serde(rename = "type")]
    ty: Option<RawType>,
    format: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "x-component-name")]
    component_name: Option<String>,
    nullable: bool,
    default: Option<Value>,
    read_only: bool,
    write_only: bool,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<Value>>,
    #[serde(rename = "const")]
    constant: Option<Value>,
    discriminator: Option<Discriminator>,

    min_length: Option<u64>,
    max_length: Option<u64>,
    pattern: Option<String>,

    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: Option<Value>,
    exclusive_maximum: Option<Value>,
    multiple_of: Option<f64>,

    items: Option<Box<Schema>>,
    min_items: Option<u64>,
    max_items: Option<u64>,
    unique_items: bool,

    properties: Option<IndexMap<String, Schema>>,
    required: Vec<String>,
    additional_properties: Option<Value>,
    min_properties: Option<u64>,
    max_properties: Option<u64>,

    all_of: Vec<Schema>,
    any_of: Vec<Schema>,
    one_of: Vec<Schema>,
    not: Option<Box<Schema>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    String,
    Number,
    Array,
    Object,
}

impl RawSchema {
    fn families(&self) -> Vec<Family> {
        let mut families = Vec::new();
        if self.min_length.is_some() || self.max_length.is_some() || self.pattern.is_some() {
            families.push(Family::String);
        }
        if self.minimum.is_some()
            || self.maximum.is_some()
            || self.exclusive_minimum.is_some()
            || self.exclusive_maximum.is_some()
            || self.multiple_of.is_some()
        {
            families.push(Family::Number);
        }
        if self.items.is_some() || self.min_items.is_some() || self.max_items.is_some() || self.unique_items {
            families.push(Family::Array);
        }
        if self.properties.is_some()
            || !self.required.is_empty()
            || self.additional_properties.is_some()
            || self.min_properties.is_some()
            || self.max_properties.is_some()
        {
            families.push(Family::Object);
        }
        families
    }

    fn string_constraints(&mut self) -> Result<StringConstraints, DocumentError> {
        Ok(StringConstraints {
            format: self.format.take(),
            min_length: self.min_length,
            max_length: self.max_length,
            pattern: self.pattern.as_deref().map(Pattern::new).transpose()?,
        })
    }

    fn number_constraints(&mut self) -> Result<NumberConstraints, DocumentError> {
        let exclusive_minimum = self
            .exclusive_minimum
            .take()
            .map(|v| RawExclusive::from_value("exclusiveMinimum", v))
            .transpose()?;
        let exclusive_maximum = self
            .exclusive_maximum
            .take()
            .map(|v| RawExclusive::from_value("exclusiveMaximum", v))
            .transpose()?;
        let minimum = match exclusive_minimum {
            Some(RawExclusive::Limit(limit)) => Some(Bound::exclusive(limit)),
            Some(RawExclusive::Flag(exclusive)) => self.minimum.map(|value| Bound { value, exclusive }),
            None => self.minimum.map(Bound::inclusive),
        };
        let maximum = match exclusive_maximum {
            Some(RawExclusive::Limit(limit)) => Some(Bound::exclusive(limit)),
            Some(RawExclusive::Flag(exclusive)) => self.maximum.map(|value| Bound { value, exclusive }),
            None => self.maximum.map(Bound::inclusive),
        };
        Ok(NumberConstraints {
            format: self.format.take(),
            minimum,
            maximum,
            multiple_of: self.multiple_of,
        })
    }

    fn array_schema(&mut self) -> ArraySchema {
        ArraySchema {
            items: self.items.take(),
            min_items: self.min_items,
            max_items: self.max_items,
            unique_items: self.unique_items,
        }
    }

    fn object_schema(&mut self) -> Result<ObjectSchema, DocumentError> {
        let additional_properties = match self.additional_properties.take() {
            None => AdditionalProperties::Unspecified,
            Some(Value::Bool(true)) => AdditionalProperties::Allowed,
            Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
            Some(value) => {
                let schema: Schema = serde_json::from_value(value).map_err(|e| {
                    DocumentError::invalid_schema(format!("additionalProperties: {e}"))
                })?;
                AdditionalProperties::Schema(Box::new(schema))
            }
        };
        Ok(ObjectSchema {
            properties: self.properties.take().unwrap_or_default(),
            required: std::mem::take(&mut self.required),
            additional_properties,
            min_properties: self.min_properties,
            max_properties: self.max_properties,
        })
    }

    fn kind_for(&mut self, family: Family) -> Result<SchemaKind, DocumentError> {
        Ok(match family {
            Family::String => SchemaKind::Primitive(Primitive::String(self.string_constraints()?)),
            Family::Number => SchemaKind::Primitive(Primitive::Number(self.number_constraints()?)),
            Family::Array => SchemaKind::Array(self.array_schema()),
            Family::Object => SchemaKind::Object(self.object_schema()?),
        })
    }
}

impl TryFrom<RawSchema> for Schema {
    type Error = DocumentError;

    fn try_from(mut raw: RawSchema) -> Result<Self, Self::Error> {
        if let Some(reference) = raw.reference.take() {
            return Err(DocumentError::UnresolvedReference(reference));
        }

        let mut nullable = raw.nullable;
        let declared = match raw.ty.take() {
            None => None,
            Some(RawType::Single(ty)) => Some(ty),
            Some(RawType::Multiple(types)) => {
                let concrete: Vec<&String> = types.iter().filter(|t| *t != "null").collect();
                match concrete.as_slice() {
                    [] => Some("null".to_string()),
                    [single] => {
                        nullable |= concrete.len() < types.len();
                        Some((*single).clone())
                    }
                    _ => {
                        return Err(DocumentError::invalid_schema(format!(
                            "multiple types {types:?} are not supported"
                        )))
                    }
                }
            }
        };

        let families = raw.families();
        let expect_only = |allowed: &[Family], ty: &str| -> Result<(), DocumentError> {
            match families.iter().find(|f| !allowed.contains(f)) {
                Some(family) => Err(DocumentError::invalid_schema(format!(
                    "{family:?} keywords on a schema of type {ty:?}"
                ))),
                None => Ok(()),
            }
        };

        let kind = match declared.as_deref() {
            Some("string") => {
                expect_only(&[Family::String], "string")?;
                raw.kind_for(Family::String)?
            }
            Some("number") => {
                expect_only(&[Family::Number], "number")?;
                SchemaKind::Primitive(Primitive::Number(raw.number_constraints()?))
            }
            Some("integer") => {
                expect_only(&[Family::Number], "integer")?;
                SchemaKind::Primitive(Primitive::Integer(raw.number_constraints()?))
            }
            Some("boolean") => {
                expect_only(&[], "boolean")?;
                SchemaKind::Primitive(Primitive::Boolean)
            }
            Some("null") => {
                expect_only(&[], "null")?;
                SchemaKind::Primitive(Primitive::Null)
            }
            Some("array") => {
                expect_only(&[Family::Array], "array")?;
                raw.kind_for(Family::Array)?
            }
            Some("object") => {
                expect_only(&[Family::Object], "object")?;
                raw.kind_for(Family::Object)?
            }
            Some(other) => {
                return Err(DocumentError::invalid_schema(format!(
                    "unknown type {other:?}"
                )))
            }
            None => match families.as_slice() {
                [] => SchemaKind::Any,
                [family] => raw.kind_for(*family)?,
                _ => {
                    return Err(DocumentError::invalid_schema(format!(
                        "keywords of several shapes ({families:?}) on an untyped schema"
                    )))
                }
            },
        };

        let enum_values = match (raw.enum_values, raw.constant) {
            (Some(values), _) => Some(values),
            (None, Some(constant)) => Some(vec![constant]),
            (None, None) => None,
        };

        Ok(Self {
            name: raw.component_name.or_else(|| raw.title.clone()),
            title: raw.title,
            description: raw.description,
            kind,
            type_declared: declared.is_some(),
            composition: Composition {
                all_of: raw.all_of,
                any_of: raw.any_of,
                one_of: raw.one_of,
                not: raw.not,
            },
            nullable,
            default: raw.default,
            read_only: raw.read_only,
            write_only: raw.write_only,
            enum_values,
            discriminator: raw.discriminator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<Schema, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_parse_primitive_with_constraints() {
        let schema = parse(json!({
            "type": "integer",
            "format": "int64",
            "minimum": 1,
            "exclusiveMaximum": 100
        }))
        .unwrap();

        let SchemaKind::Primitive(Primitive::Integer(c)) = &schema.kind else {
            panic!("expected integer, got {:?}", schema.kind);
        };
        assert_eq!(c.format.as_deref(), Some("int64"));
        assert_eq!(c.minimum, Some(Bound::inclusive(1.0)));
        assert_eq!(c.maximum, Some(Bound::exclusive(100.0)));
    }

    #[test]
    fn test_parse_openapi30_exclusive_flag() {
        let schema = parse(json!({
            "type": "number",
            "minimum": 0,
            "exclusiveMinimum": true
        }))
        .unwrap();
        let SchemaKind::Primitive(Primitive::Number(c)) = &schema.kind else {
            panic!("expected number");
        };
        assert_eq!(c.minimum, Some(Bound::exclusive(0.0)));
    }

    #[test]
    fn test_parse_type_array_with_null_is_nullable() {
        let schema = parse(json!({ "type": ["string", "null"] })).unwrap();
        assert!(schema.nullable);
        assert_eq!(schema.type_name(), Some("string"));
    }

    #[test]
    fn test_parse_rejects_reference() {
        let err = parse(json!({ "$ref": "#/components/schemas/Pet" })).unwrap_err();
        assert!(err.to_string().contains("unresolved reference"));
    }

    #[test]
    fn test_parse_rejects_mixed_shapes() {
        assert!(parse(json!({ "items": {}, "properties": {} })).is_err());
        assert!(parse(json!({ "type": "array", "properties": {} })).is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_pattern() {
        let err = parse(json!({ "type": "string", "pattern": "(" })).unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn test_untyped_object_keywords_infer_object() {
        let schema = parse(json!({ "required": ["id"] })).unwrap();
        assert!(!schema.type_declared);
        assert_eq!(schema.as_object().unwrap().required, vec!["id".to_string()]);
    }

    #[test]
    fn test_additional_properties_variants() {
        let forbidden = parse(json!({ "type": "object", "additionalProperties": false })).unwrap();
        assert_eq!(
            forbidden.as_object().unwrap().additional_properties,
            AdditionalProperties::Forbidden
        );

        let typed = parse(json!({
            "type": "object",
            "additionalProperties": { "type": "integer" }
        }))
        .unwrap();
        assert!(matches!(
            typed.as_object().unwrap().additional_properties,
            AdditionalProperties::Schema(_)
        ));

        let unspecified = parse(json!({ "type": "object" })).unwrap();
        assert_eq!(
            unspecified.as_object().unwrap().additional_properties,
            AdditionalProperties::Unspecified
        );
    }

    #[test]
    fn test_const_becomes_single_enum() {
        let schema = parse(json!({ "const": "fixed" })).unwrap();
        assert_eq!(schema.enum_values, Some(vec![json!("fixed")]));
    }

    #[test]
    fn test_component_name_falls_back_to_title() {
        let named = parse(json!({ "type": "object", "x-component-name": "Cat", "title": "A cat" })).unwrap();
        assert_eq!(named.name.as_deref(), Some("Cat"));
        let titled = parse(json!({ "type": "object", "title": "Dog" })).unwrap();
        assert_eq!(titled.name.as_deref(), Some("Dog"));
    }

    #[test]
    fn test_effective_default_prefers_first_all_of_branch() {
        let schema = Schema::all_of(vec![
            Schema::string().default_value(json!("first")),
            Schema::string().default_value(json!("second")),
        ]);
        assert_eq!(schema.effective_default(), Some(&json!("first")));
    }

    #[test]
    fn test_property_lookup_reaches_composition_branches() {
        let schema = Schema::all_of(vec![
            Schema::object().property("a", Schema::string()),
            Schema::object().property("b", Schema::integer()),
        ]);
        assert!(schema.declares_property("b"));
        assert!(!schema.declares_property("c"));
        assert_eq!(schema.property_schema("b"), Some(&Schema::integer()));
    }

    #[test]
    fn test_property_schema_after_builder() {
        let schema = Schema::object()
            .property("id", Schema::integer().format("int64"))
            .property("name", Schema::string());
        assert_eq!(
            schema.property_schema("id").and_then(Schema::format_name),
            Some("int64")
        );
        assert!(schema.property_schema("missing").is_none());
        assert!(Schema::string().property_schema("id").is_none());
    }

    #[test]
    fn test_builders_ignore_foreign_constraints() {
        let schema = Schema::string().minimum(Bound::inclusive(3.0)).min_items(2);
        assert_eq!(schema.kind, Schema::string().kind);
    }

    #[test]
    fn test_binary_detection() {
        assert!(Schema::string().format("binary").is_binary());
        assert!(!Schema::string().format("byte").is_binary());
    }
}
