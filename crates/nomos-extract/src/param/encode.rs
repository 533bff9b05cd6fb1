//! Re-encoding of injected defaults.
//!
//! When a parameter is absent and its schema has a default, the default is
//! written back into the request in the parameter's own serialization so
//! downstream code sees it like any other parameter.

use nomos_core::{Parameter, SerializationMethod, Style};
use serde_json::Value;

/// Text form of a scalar.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn method_of(parameter: &Parameter) -> SerializationMethod {
    parameter
        .serialization_method()
        .unwrap_or_else(|| SerializationMethod::default_for(parameter.location))
}

/// Query pairs for a value, in the parameter's style.
///
/// Exploded arrays repeat the key; `deepObject` nests bracketed keys.
pub fn encode_query(parameter: &Parameter, value: &Value) -> Vec<(String, String)> {
    let name = parameter.name.as_str();
    let method = method_of(parameter);
    match value {
        Value::Array(items) => match (method.style, method.explode) {
            (Style::Form, true) => items
                .iter()
                .map(|item| (name.to_string(), scalar_text(item)))
                .collect(),
            (style, _) => vec![(name.to_string(), join(items, array_delimiter(style)))],
        },
        Value::Object(map) => match (method.style, method.explode) {
            (Style::DeepObject, _) => {
                let mut pairs = Vec::new();
                deep_pairs(name, value, &mut pairs);
                pairs
            }
            (Style::Form, true) => map
                .iter()
                .map(|(key, item)| (key.clone(), flat_text(item)))
                .collect(),
            _ => vec![(name.to_string(), alternate(map))],
        },
        scalar => vec![(name.to_string(), scalar_text(scalar))],
    }
}

/// A header value for a value, in `simple` style.
pub fn encode_header(parameter: &Parameter, value: &Value) -> String {
    let method = method_of(parameter);
    match value {
        Value::Array(items) => join(items, ","),
        Value::Object(map) if method.explode => map
            .iter()
            .map(|(key, item)| format!("{key}={}", flat_text(item)))
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(map) => alternate(map),
        scalar => scalar_text(scalar),
    }
}

/// A `name=value` cookie pair for a value, in `form` style.
pub fn encode_cookie(parameter: &Parameter, value: &Value) -> String {
    let text = match value {
        Value::Array(items) => join(items, ","),
        Value::Object(map) => alternate(map),
        scalar => scalar_text(scalar),
    };
    format!("{}={text}", parameter.name)
}

/// Appends pairs to a raw query string, percent-encoding them.
pub fn append_query(query: Option<&str>, pairs: &[(String, String)]) -> String {
    let encoded = pairs
        .iter()
        .map(|(key, value)| {
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
        });
    query
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .into_iter()
        .chain(encoded)
        .collect::<Vec<_>>()
        .join("&")
}

fn array_delimiter(style: Style) -> &'static str {
    match style {
        Style::SpaceDelimited => " ",
        Style::PipeDelimited => "|",
        _ => ",",
    }
}

fn join(items: &[Value], delim: &str) -> String {
    items.iter().map(scalar_text).collect::<Vec<_>>().join(delim)
}

fn flat_text(value: &Value) -> String {
    match value {
        Value::Array(items) => join(items, ","),
        other => scalar_text(other),
    }
}

fn alternate(map: &serde_json::Map<String, Value>) -> String {
    map.iter()
        .flat_map(|(key, item)| [key.clone(), flat_text(item)])
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn deep_pairs(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                deep_pairs(&format!("{prefix}[{key}]"), item, pairs);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                deep_pairs(&format!("{prefix}[{index}]"), item, pairs);
            }
        }
        scalar => pairs.push((prefix.to_string(), scalar_text(scalar))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomos_core::{Location, Schema};
    use serde_json::json;

    fn param(location: Location, schema: Schema, style: Option<(Style, bool)>) -> Parameter {
        let builder = Parameter::builder("p", location).schema(schema);
        let builder = match style {
            Some((style, explode)) => builder.style(style, explode),
            None => builder,
        };
        builder.build().unwrap()
    }

    #[test]
    fn test_exploded_array_repeats_key() {
        let p = param(Location::Query, Schema::array(Schema::string()), None);
        assert_eq!(
            encode_query(&p, &json!(["a", "b"])),
            vec![("p".to_string(), "a".to_string()), ("p".to_string(), "b".to_string())]
        );
    }

    #[test]
    fn test_delimited_array() {
        let p = param(
            Location::Query,
            Schema::array(Schema::integer()),
            Some((Style::PipeDelimited, false)),
        );
        assert_eq!(encode_query(&p, &json!([1, 2])), vec![("p".to_string(), "1|2".to_string())]);
    }

    #[test]
    fn test_deep_object() {
        let p = param(
            Location::Query,
            Schema::object().property("id", Schema::any()),
            Some((Style::DeepObject, true)),
        );
        assert_eq!(
            encode_query(&p, &json!({"id": {"eq": "1"}})),
            vec![("p[id][eq]".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn test_header_and_cookie() {
        let h = param(Location::Header, Schema::object(), Some((Style::Simple, true)));
        assert_eq!(encode_header(&h, &json!({"a": 1, "b": "x"})), "a=1,b=x");
        let c = param(Location::Cookie, Schema::integer(), None);
        assert_eq!(encode_cookie(&c, &json!(20)), "p=20");
    }

    #[test]
    fn test_append_query() {
        let pairs = vec![("limit".to_string(), "20".to_string()), ("q".to_string(), "a b".to_string())];
        assert_eq!(append_query(Some("x=1"), &pairs), "x=1&limit=20&q=a%20b");
        assert_eq!(append_query(None, &pairs[..1]), "limit=20");
    }
}
