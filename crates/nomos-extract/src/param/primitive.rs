//! Leaf parsing shared by every location.
//!
//! A raw string becomes a JSON value according to the schema it is declared
//! with. An empty raw string decodes to `None`, which callers report as a
//! present but empty parameter.

use std::borrow::Cow;

use nomos_core::{ParseError, Primitive, Schema, SchemaKind};
use nomos_schema::compare::is_integer;
use nomos_schema::SchemaValidator;
use serde_json::{Map, Number, Value};

/// Parses one raw value.
///
/// A primitive `oneOf`/`anyOf`/`allOf` picks the first branch that both
/// parses the value and accepts it; failing that, the first branch that
/// parses it.
pub(crate) fn parse_primitive(
    raw: &str,
    schema: &Schema,
    validator: &SchemaValidator,
) -> Result<Option<Value>, ParseError> {
    if raw.is_empty() {
        return Ok(None);
    }
    match &schema.kind {
        SchemaKind::Primitive(primitive) => parse_typed(raw, primitive).map(Some),
        SchemaKind::Any if schema.composition.is_empty() => Ok(Some(Value::String(raw.to_string()))),
        SchemaKind::Any => parse_composed(raw, schema, validator).map(Some),
        SchemaKind::Array(_) | SchemaKind::Object(_) => Err(ParseError::unsupported_format(
            format!("a single value cannot hold an {}", type_label(schema)),
        )
        .with_value(raw)),
    }
}

fn type_label(schema: &Schema) -> &'static str {
    match schema.kind {
        SchemaKind::Array(_) => "array",
        _ => "object",
    }
}

fn parse_typed(raw: &str, primitive: &Primitive) -> Result<Value, ParseError> {
    match primitive {
        Primitive::String(_) => Ok(Value::String(raw.to_string())),
        Primitive::Integer(_) => raw
            .parse::<Number>()
            .ok()
            .filter(is_integer)
            .map(Value::Number)
            .ok_or_else(|| ParseError::invalid_format(raw, "an invalid integer")),
        Primitive::Number(_) => raw
            .parse::<Number>()
            .map(Value::Number)
            .map_err(|e| ParseError::invalid_format(raw, "an invalid number").with_source(e)),
        Primitive::Boolean => parse_bool(raw)
            .map(Value::Bool)
            .ok_or_else(|| ParseError::invalid_format(raw, "an invalid boolean")),
        Primitive::Null if raw == "null" => Ok(Value::Null),
        Primitive::Null => Err(ParseError::invalid_format(raw, "an invalid null")),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn parse_composed(
    raw: &str,
    schema: &Schema,
    validator: &SchemaValidator,
) -> Result<Value, ParseError> {
    let composition = &schema.composition;
    let branches: Vec<&Schema> = composition
        .one_of
        .iter()
        .chain(&composition.any_of)
        .chain(&composition.all_of)
        .collect();
    if branches.is_empty() {
        return Ok(Value::String(raw.to_string()));
    }

    let mut fallback = None;
    for branch in branches {
        if let Ok(Some(value)) = parse_primitive(raw, branch, validator) {
            if validator.check(branch, &value).is_ok() {
                return Ok(value);
            }
            fallback.get_or_insert(value);
        }
    }
    fallback.ok_or_else(|| {
        ParseError::invalid_format(raw, "value doesn't match any of the composed schemas")
    })
}

/// Parses the items of a delimited array.
///
/// An empty item makes the whole array empty.
pub(crate) fn parse_array(
    items: &[String],
    schema: &Schema,
    validator: &SchemaValidator,
) -> Result<Option<Value>, ParseError> {
    let item_schema = schema.as_array().and_then(|array| array.items.as_deref());
    let mut values = Vec::with_capacity(items.len());
    for (index, raw) in items.iter().enumerate() {
        let item = match item_schema {
            Some(item_schema) => parse_primitive(raw, item_schema, validator),
            None => Ok((!raw.is_empty()).then(|| Value::String(raw.clone()))),
        }
        .map_err(|e| e.at(index))?;
        match item {
            Some(item) => values.push(item),
            None => return Ok(None),
        }
    }
    Ok(Some(Value::Array(values)))
}

/// Builds an object from raw property pairs.
///
/// Declared properties are parsed with their schema; array properties are
/// split on `,`. Undeclared properties stay strings so that
/// `additionalProperties: false` can reject them.
pub(crate) fn make_object(
    props: Vec<(String, String)>,
    schema: &Schema,
    validator: &SchemaValidator,
) -> Result<Value, ParseError> {
    let mut object = Map::new();
    for (name, raw) in props {
        let value = match schema.property_schema(&name) {
            Some(property) if property.as_array().is_some() => {
                let items: Vec<String> = raw.split(',').map(str::to_string).collect();
                parse_array(&items, property, validator)
            }
            Some(property) => parse_primitive(&raw, property, validator),
            None => Ok(Some(Value::String(raw))),
        }
        .map_err(|e| e.at(name.as_str()))?;
        if let Some(value) = value {
            object.insert(name, value);
        }
    }
    Ok(Value::Object(object))
}

/// Splits `name<value_delim>value<prop_delim>...` into pairs.
///
/// With equal delimiters the list alternates names and values.
pub(crate) fn props_from_string(
    src: &str,
    prop_delim: char,
    value_delim: char,
) -> Result<Vec<(String, String)>, ParseError> {
    let malformed = || {
        ParseError::invalid_format(
            src,
            format!(
                "a value must be a list of object's properties in format \"name{value_delim}value\" separated by {prop_delim}"
            ),
        )
    };

    if prop_delim == value_delim {
        let tokens: Vec<&str> = src.split(prop_delim).collect();
        if tokens.len() % 2 != 0 {
            return Err(malformed());
        }
        return Ok(tokens
            .chunks(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect());
    }

    src.split(prop_delim)
        .map(|token| {
            token
                .split_once(value_delim)
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(malformed)
        })
        .collect()
}

/// Strips a mandatory style prefix.
pub(crate) fn cut_prefix<'a>(raw: &'a str, prefix: &str) -> Result<&'a str, ParseError> {
    raw.strip_prefix(prefix).ok_or_else(|| {
        ParseError::invalid_format(raw, format!("a value must be prefixed with \"{prefix}\""))
    })
}

/// Percent-decodes one path item.
pub(crate) fn percent_decode(raw: &str) -> Result<String, ParseError> {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .map_err(|e| ParseError::invalid_format(raw, "invalid percent-encoding").with_source(e))
}

/// Property names of an object schema and of its composition branches.
pub(crate) fn property_names(schema: &Schema) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    collect_property_names(schema, &mut names);
    names
}

fn collect_property_names<'s>(schema: &'s Schema, names: &mut Vec<&'s str>) {
    if let Some(object) = schema.as_object() {
        for name in object.properties.keys() {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
    }
    for branch in schema.composition.branches() {
        collect_property_names(branch, names);
    }
}
