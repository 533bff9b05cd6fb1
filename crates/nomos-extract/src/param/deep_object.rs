//! `deepObject` query parameters.
//!
//! `filter[id][eq]=1&filter[tags][0]=a` is parsed into a tree keyed by the
//! bracketed segments, guided by the schema: a segment under an array schema
//! must be an index, anything else is an object key. Missing array slots are
//! kept as holes and surface as `null`.

use indexmap::IndexMap;
use nomos_core::{ParseError, Schema};
use nomos_schema::SchemaValidator;
use serde_json::{Map, Value};

use super::primitive::parse_primitive;
use super::Decoded;

/// Largest accepted array index.
const MAX_INDEX: usize = 1024;

#[derive(Debug)]
enum Node {
    Leaf(String),
    Map(IndexMap<String, Node>),
    List(Vec<Option<Node>>),
}

impl Node {
    fn container_for(schema: Option<&Schema>) -> Self {
        if schema.is_some_and(is_array) {
            Self::List(Vec::new())
        } else {
            Self::Map(IndexMap::new())
        }
    }

    fn insert(&mut self, segments: &[&str], raw: &str, schema: Option<&Schema>) -> Result<(), ParseError> {
        let Some((segment, rest)) = segments.split_first() else {
            return Ok(());
        };
        match self {
            Self::Leaf(_) => Err(ParseError::invalid_format(
                raw,
                "path traverses through a scalar value",
            )),
            Self::Map(map) => {
                let child_schema = schema.and_then(|s| s.property_schema(segment));
                if rest.is_empty() {
                    let leaf = set_leaf(map.get(*segment), child_schema, raw)
                        .map_err(|e| e.at(*segment))?;
                    map.insert((*segment).to_string(), leaf);
                    return Ok(());
                }
                map.entry((*segment).to_string())
                    .or_insert_with(|| Self::container_for(child_schema))
                    .insert(rest, raw, child_schema)
                    .map_err(|e| e.at(*segment))
            }
            Self::List(items) => {
                let index = parse_index(segment)?;
                if items.len() <= index {
                    items.resize_with(index + 1, || None);
                }
                let item_schema = schema
                    .and_then(Schema::as_array)
                    .and_then(|array| array.items.as_deref());
                if rest.is_empty() {
                    let leaf = set_leaf(items[index].as_ref(), item_schema, raw).map_err(|e| e.at(index))?;
                    items[index] = Some(leaf);
                    return Ok(());
                }
                items[index]
                    .get_or_insert_with(|| Self::container_for(item_schema))
                    .insert(rest, raw, item_schema)
                    .map_err(|e| e.at(index))
            }
        }
    }

    fn into_value(self, schema: Option<&Schema>, validator: &SchemaValidator) -> Result<Value, ParseError> {
        match self {
            Self::Leaf(raw) => match schema {
                Some(schema) => {
                    Ok(parse_primitive(&raw, schema, validator)?.unwrap_or(Value::String(raw)))
                }
                None => Ok(Value::String(raw)),
            },
            Self::Map(map) => {
                let mut object = Map::new();
                for (key, child) in map {
                    let child_schema = schema.and_then(|s| s.property_schema(&key));
                    let value = child
                        .into_value(child_schema, validator)
                        .map_err(|e| e.at(key.as_str()))?;
                    object.insert(key, value);
                }
                Ok(Value::Object(object))
            }
            Self::List(items) => {
                let item_schema = schema
                    .and_then(Schema::as_array)
                    .and_then(|array| array.items.as_deref());
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| match item {
                        Some(item) => item.into_value(item_schema, validator).map_err(|e| e.at(index)),
                        None => Ok(Value::Null),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }
}

fn is_array(schema: &Schema) -> bool {
    schema.as_array().is_some() || schema.composition.branches().any(|b| b.as_array().is_some())
}

fn set_leaf(existing: Option<&Node>, schema: Option<&Schema>, raw: &str) -> Result<Node, ParseError> {
    if schema.is_some_and(|s| s.as_array().is_some()) {
        return Err(ParseError::invalid_format(raw, "array items must be set with indexes"));
    }
    if matches!(existing, Some(Node::Map(_) | Node::List(_))) {
        return Err(ParseError::invalid_format(
            raw,
            "a scalar value is set where nested keys exist",
        ));
    }
    Ok(Node::Leaf(raw.to_string()))
}

fn parse_index(segment: &str) -> Result<usize, ParseError> {
    match segment.parse::<usize>() {
        Ok(index) if index <= MAX_INDEX => Ok(index),
        Ok(_) => Err(ParseError::invalid_format(
            segment,
            format!("array index must not exceed {MAX_INDEX}"),
        )),
        Err(e) => Err(ParseError::invalid_format(segment, "array items must be set with indexes")
            .with_source(e)),
    }
}

fn parse_segments(mut rest: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let (segment, tail) = rest.strip_prefix('[')?.split_once(']')?;
        if segment.is_empty() {
            return None;
        }
        segments.push(segment);
        rest = tail;
    }
    Some(segments)
}

/// Decodes `name[...]` keys of the query into one value.
pub(crate) fn decode(
    name: &str,
    pairs: &[(String, String)],
    schema: &Schema,
    validator: &SchemaValidator,
) -> Result<Decoded, ParseError> {
    let mut root = Node::Map(IndexMap::new());
    let mut found = false;
    let mut nested = false;

    for (key, raw) in pairs {
        let Some(rest) = key.strip_prefix(name) else {
            continue;
        };
        if rest.is_empty() {
            found = true;
            continue;
        }
        if !rest.starts_with('[') {
            continue;
        }
        let segments = parse_segments(rest).ok_or_else(|| {
            ParseError::invalid_format(key.as_str(), "a deepObject key must be a sequence of bracketed names")
        })?;
        root.insert(&segments, raw, Some(schema))?;
        found = true;
        nested = true;
    }

    if !nested {
        return Ok(if found { Decoded::Empty } else { Decoded::Absent });
    }
    root.into_value(Some(schema), validator).map(Decoded::Value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomos_core::{ParseErrorKind, PathSegment};
    use serde_json::json;

    fn pairs(query: &[(&str, &str)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn filter_schema() -> Schema {
        Schema::object()
            .property(
                "id",
                Schema::one_of(vec![
                    Schema::string(),
                    Schema::object().property("eq", Schema::string()),
                ]),
            )
            .property("tags", Schema::array(Schema::string()))
            .property("limit", Schema::integer())
    }

    fn decode_filter(query: &[(&str, &str)]) -> Result<Decoded, ParseError> {
        decode("filter", &pairs(query), &filter_schema(), &SchemaValidator::default())
    }

    #[test]
    fn test_nested_object_through_one_of() {
        let decoded = decode_filter(&[("filter[id][eq]", "1")]).unwrap();
        assert_eq!(decoded, Decoded::Value(json!({"id": {"eq": "1"}})));
    }

    #[test]
    fn test_typed_leaves() {
        let decoded = decode_filter(&[("filter[limit]", "10"), ("filter[id]", "abc")]).unwrap();
        assert_eq!(decoded, Decoded::Value(json!({"limit": 10, "id": "abc"})));
    }

    #[test]
    fn test_sparse_array_keeps_holes() {
        let decoded = decode_filter(&[("filter[tags][2]", "c"), ("filter[tags][0]", "a")]).unwrap();
        assert_eq!(decoded, Decoded::Value(json!({"tags": ["a", null, "c"]})));
    }

    #[test]
    fn test_array_needs_indexes() {
        let err = decode_filter(&[("filter[tags]", "a")]).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::InvalidFormat);
        assert_eq!(err.reason(), "array items must be set with indexes");
        assert_eq!(err.path(), &[PathSegment::from("tags")]);

        let err = decode_filter(&[("filter[tags][x]", "a")]).unwrap_err();
        assert_eq!(err.reason(), "array items must be set with indexes");
    }

    #[test]
    fn test_scalar_cannot_be_traversed() {
        let err = decode_filter(&[("filter[x]", "1"), ("filter[x][y]", "2")]).unwrap_err();
        assert_eq!(err.reason(), "path traverses through a scalar value");
        assert_eq!(err.path(), &[PathSegment::from("x")]);
    }

    #[test]
    fn test_absent_and_empty() {
        assert_eq!(decode_filter(&[("other[a]", "1")]).unwrap(), Decoded::Absent);
        assert_eq!(decode_filter(&[("filter", "")]).unwrap(), Decoded::Empty);
        assert_eq!(decode_filter(&[("filtered", "1")]).unwrap(), Decoded::Absent);
    }

    #[test]
    fn test_malformed_key() {
        let err = decode_filter(&[("filter[a", "1")]).unwrap_err();
        assert_eq!(err.value(), Some("filter[a"));
    }
}
