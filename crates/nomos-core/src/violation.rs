//! Schema violations.
//!
//! A [`SchemaError`] names the schema keyword that failed (`schema_field`),
//! the JSON pointer of the offending value and, for composition envelopes,
//! an origin chain down to the concrete cause.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::error::MultiError;

/// A decoded value violates a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    /// The offending value.
    pub value: Value,
    /// The keyword that failed (`type`, `enum`, `required`, `readOnly`, ...).
    pub schema_field: &'static str,
    /// Human-readable reason.
    pub reason: String,
    /// Path segments from the root to the value.
    pub path: Vec<String>,
    /// Allowed values, for `enum` failures.
    pub allowed_values: Option<Vec<Value>>,
    /// The nested cause of a composition failure.
    pub origin: Option<Box<SchemaViolation>>,
    /// Replacement message from a custom formatter.
    pub message: Option<String>,
}

impl SchemaError {
    /// Creates an error at `path`.
    pub fn new(
        value: Value,
        schema_field: &'static str,
        reason: impl Into<String>,
        path: Vec<String>,
    ) -> Self {
        Self {
            value,
            schema_field,
            reason: reason.into(),
            path,
            allowed_values: None,
            origin: None,
            message: None,
        }
    }

    /// Attaches the list of allowed values.
    #[must_use]
    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    /// Attaches the nested cause.
    #[must_use]
    pub fn with_origin(mut self, origin: SchemaViolation) -> Self {
        self.origin = Some(Box::new(origin));
        self
    }

    /// The path as a JSON pointer (`/pets/0/name`); empty for the root.
    pub fn json_pointer(&self) -> String {
        self.path
            .iter()
            .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
            .collect()
    }

    /// Follows the origin chain to the concrete cause.
    pub fn deepest(&self) -> &SchemaError {
        match self.origin.as_deref() {
            Some(origin) => origin.deepest().unwrap_or(self),
            None => self,
        }
    }

    /// Whether the error rejects a readOnly or writeOnly property.
    pub fn is_access_violation(&self) -> bool {
        matches!(self.schema_field, "readOnly" | "writeOnly")
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            return f.write_str(message);
        }
        if let Some(origin) = &self.origin {
            return write!(f, "{origin}");
        }
        if !self.path.is_empty() {
            write!(f, "Error at \"{}\": ", self.json_pointer())?;
        }
        if self.reason.is_empty() {
            write!(f, "doesn't match schema \"{}\"", self.schema_field)
        } else {
            f.write_str(&self.reason)
        }
    }
}

impl std::error::Error for SchemaError {}

/// The result of a failed schema validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaViolation {
    /// Fail-fast: the first failure.
    #[error(transparent)]
    Single(Box<SchemaError>),
    /// Multi-error mode: every failure.
    #[error(transparent)]
    Multi(MultiError<SchemaError>),
}

impl SchemaViolation {
    /// Iterates over the top-level errors.
    pub fn errors(&self) -> Box<dyn Iterator<Item = &SchemaError> + '_> {
        match self {
            Self::Single(error) => Box::new(std::iter::once(error.as_ref())),
            Self::Multi(errors) => Box::new(errors.iter()),
        }
    }

    /// The first top-level error.
    pub fn first(&self) -> Option<&SchemaError> {
        self.errors().next()
    }

    /// The concrete cause of the first error.
    pub fn deepest(&self) -> Option<&SchemaError> {
        self.first().map(SchemaError::deepest)
    }
}

impl From<SchemaError> for SchemaViolation {
    fn from(error: SchemaError) -> Self {
        Self::Single(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_with_pointer() {
        let err = SchemaError::new(
            json!(5),
            "type",
            "value must be a string",
            vec!["pets".into(), "0".into(), "a/b".into()],
        );
        assert_eq!(err.json_pointer(), "/pets/0/a~1b");
        assert_eq!(err.to_string(), "Error at \"/pets/0/a~1b\": value must be a string");
    }

    #[test]
    fn test_envelope_displays_origin_and_unwraps() {
        let cause = SchemaError::new(json!(1), "type", "value must be a string", vec!["a".into()]);
        let envelope = SchemaError::new(json!({"a": 1}), "allOf", "doesn't match all schemas from \"allOf\"", vec![])
            .with_origin(cause.clone().into());

        assert_eq!(envelope.to_string(), cause.to_string());
        assert_eq!(envelope.deepest(), &cause);
        assert_eq!(envelope.reason, "doesn't match all schemas from \"allOf\"");
    }

    #[test]
    fn test_custom_message_wins() {
        let mut err = SchemaError::new(json!(null), "nullable", "Value is not nullable", vec![]);
        err.message = Some("custom".into());
        assert_eq!(err.to_string(), "custom");
    }

    #[test]
    fn test_violation_iterates_errors() {
        let violation = SchemaViolation::Multi(
            vec![
                SchemaError::new(json!(1), "type", "first", vec![]),
                SchemaError::new(json!(2), "type", "second", vec![]),
            ]
            .into(),
        );
        assert_eq!(violation.errors().count(), 2);
        assert_eq!(violation.first().map(|e| e.reason.as_str()), Some("first"));
        assert_eq!(violation.to_string(), "first | second");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn unescape(token: &str) -> String {
        token.replace("~1", "/").replace("~0", "~")
    }

    proptest! {
        /// A pointer decodes back to the exact path, whatever the segments hold.
        #[test]
        fn json_pointer_round_trips(path in prop::collection::vec("[a-z0-9~/]{0,6}", 0..5)) {
            let err = SchemaError::new(json!(null), "type", "reason", path.clone());
            let pointer = err.json_pointer();

            let decoded: Vec<String> = if pointer.is_empty() {
                Vec::new()
            } else {
                pointer[1..].split('/').map(unescape).collect()
            };
            prop_assert_eq!(decoded, path);
        }
    }
}
