//! Error types shared across nomos.
//!
//! Two families live here:
//!
//! - [`DocumentError`] reports a malformed document tree. It is raised while
//!   the tree is constructed, and by validators that run into a combination
//!   the constructors should have rejected. It is never a user-input error.
//! - [`ParseError`] reports a raw HTTP value (parameter string or body) that
//!   could not be decoded. It carries a [`ParseErrorKind`], the offending raw
//!   value and a structural path down to the exact leaf.
//!
//! [`MultiError`] is the opt-in aggregate used when every failure should be
//! reported instead of the first one.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::parameter::{Location, Style};

/// Errors raised while building or interpreting the document tree.
///
/// Once a document has passed its own structural validation these are
/// unreachable from request data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// A `$ref` survived into the resolved tree.
    #[error("unresolved reference {0:?}")]
    UnresolvedReference(String),

    /// A schema combines keywords that cannot describe a single shape.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A `pattern` is not a valid regular expression.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Why the regex engine rejected it.
        reason: String,
    },

    /// The (location, style, explode) combination is not in the legal set.
    #[error("parameter {name:?} in {location}: style {style} with explode={explode} is not supported")]
    InvalidSerialization {
        /// Parameter name.
        name: String,
        /// Parameter location.
        location: Location,
        /// Declared style.
        style: Style,
        /// Declared explode flag.
        explode: bool,
    },

    /// Any other inconsistency in a parameter declaration.
    #[error("parameter {name:?} in {location}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Parameter location.
        location: Location,
        /// What is wrong with it.
        reason: String,
    },

    /// A security requirement names a scheme that `components` does not declare.
    #[error("security scheme {0:?} is not declared")]
    UndeclaredSecurityScheme(String),
}

impl DocumentError {
    /// Creates an [`DocumentError::InvalidSchema`] error.
    pub fn invalid_schema(reason: impl Into<String>) -> Self {
        Self::InvalidSchema(reason.into())
    }

    /// Creates an [`DocumentError::InvalidParameter`] error.
    pub fn invalid_parameter(
        name: impl Into<String>,
        location: Location,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            location,
            reason: reason.into(),
        }
    }
}

/// Classification of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// The raw value does not follow the declared serialization.
    InvalidFormat,
    /// Nothing knows how to decode this format (e.g. an unregistered media type).
    UnsupportedFormat,
    /// Anything else, such as a multipart part with no declared property.
    Other,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidFormat => "invalid format",
            Self::UnsupportedFormat => "unsupported format",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// One step of a structural path: a property name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object property.
    Key(String),
    /// Array element.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A raw value could not be decoded.
///
/// # Example
///
/// ```
/// use nomos_core::{ParseError, ParseErrorKind};
///
/// let err = ParseError::invalid_format("foo,bar", "a value must be prefixed with \".\"")
///     .at("tags");
///
/// assert_eq!(err.kind(), ParseErrorKind::InvalidFormat);
/// assert_eq!(
///     err.to_string(),
///     "path tags: value foo,bar: a value must be prefixed with \".\""
/// );
/// ```
#[derive(Debug)]
pub struct ParseError {
    kind: ParseErrorKind,
    value: Option<String>,
    reason: String,
    path: Vec<PathSegment>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ParseError {
    /// Creates an error of the given kind.
    pub fn new(kind: ParseErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            value: None,
            reason: reason.into(),
            path: Vec::new(),
            source: None,
        }
    }

    /// The raw value does not follow the declared serialization.
    pub fn invalid_format(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::InvalidFormat, reason).with_value(value)
    }

    /// No decoder exists for the value's format.
    pub fn unsupported_format(reason: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::UnsupportedFormat, reason)
    }

    /// Any failure that is neither a format problem nor an unsupported format.
    pub fn other(reason: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Other, reason)
    }

    /// Attaches the offending raw value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Prepends a path segment, as the error travels up out of a container.
    #[must_use]
    pub fn at(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Returns the offending raw value, if known.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the human-readable reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the path from the parameter or body root to the failing leaf.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        if !self.path.is_empty() {
            let path: Vec<String> = self.path.iter().map(ToString::to_string).collect();
            parts.push(format!("path {}", path.join(".")));
        }
        if let Some(value) = &self.value {
            parts.push(format!("value {value}"));
        }
        if !self.reason.is_empty() {
            parts.push(self.reason.clone());
        }
        if let Some(source) = &self.source {
            parts.push(source.to_string());
        }
        f.write_str(&parts.join(": "))
    }
}

impl StdError for ParseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

/// An ordered collection of independent failures.
///
/// Only produced when multi-error mode is switched on; the default policy is
/// to stop at the first failure.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiError<E>(Vec<E>);

impl<E> MultiError<E> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a failure.
    pub fn push(&mut self, error: E) {
        self.0.push(error);
    }

    /// Number of collected failures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the failures in the order they occurred.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.0.iter()
    }

    /// Returns the first failure.
    pub fn first(&self) -> Option<&E> {
        self.0.first()
    }

    /// Consumes the collection.
    pub fn into_inner(self) -> Vec<E> {
        self.0
    }
}

impl<E> Default for MultiError<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> From<Vec<E>> for MultiError<E> {
    fn from(errors: Vec<E>) -> Self {
        Self(errors)
    }
}

impl<E> FromIterator<E> for MultiError<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<E> IntoIterator for MultiError<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a MultiError<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<E: fmt::Display> fmt::Display for MultiError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl<E: StdError> StdError for MultiError<E> {}
