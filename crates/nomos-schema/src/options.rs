//! Validation options.

use std::fmt;
use std::sync::Arc;

use nomos_core::SchemaError;
use serde_json::Value;

/// Decides whether the items of an array are unique.
pub type UniqueItemsChecker = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Builds a replacement message for a schema error.
pub type ErrorFormatter = Arc<dyn Fn(&SchemaError) -> String + Send + Sync>;

/// Which side of the exchange a value belongs to.
///
/// The direction decides which of `readOnly` and `writeOnly` is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Request payload: `readOnly` properties are rejected.
    Request,
    /// Response payload: `writeOnly` properties are rejected.
    Response,
    /// Neither is enforced.
    #[default]
    Neutral,
}

/// Settings for one validation run.
///
/// # Example
///
/// ```
/// use nomos_schema::{Direction, ValidationOptions};
///
/// let options = ValidationOptions::request().multi_error(true).skip_defaults(true);
/// assert_eq!(options.direction, Direction::Request);
/// assert!(options.multi_error);
/// ```
#[derive(Clone)]
pub struct ValidationOptions {
    /// Request, response or neutral.
    pub direction: Direction,
    /// Collect every failure instead of stopping at the first.
    pub multi_error: bool,
    /// Do not write defaults into the value.
    pub skip_defaults: bool,
    /// Accept `readOnly` properties in requests.
    pub exclude_read_only: bool,
    /// Accept `writeOnly` properties in responses.
    pub exclude_write_only: bool,
    /// Check `pattern`.
    pub pattern_validation: bool,
    /// Check string `format`.
    pub format_validation: bool,
    /// Remove undeclared properties instead of validating them.
    pub trim_additional_properties: bool,
    /// Replaces the structural uniqueness check for `uniqueItems`.
    pub unique_items: Option<UniqueItemsChecker>,
    /// Replaces error messages.
    pub error_formatter: Option<ErrorFormatter>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Neutral,
            multi_error: false,
            skip_defaults: false,
            exclude_read_only: false,
            exclude_write_only: false,
            pattern_validation: true,
            format_validation: true,
            trim_additional_properties: false,
            unique_items: None,
            error_formatter: None,
        }
    }
}

impl fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("direction", &self.direction)
            .field("multi_error", &self.multi_error)
            .field("skip_defaults", &self.skip_defaults)
            .field("exclude_read_only", &self.exclude_read_only)
            .field("exclude_write_only", &self.exclude_write_only)
            .field("pattern_validation", &self.pattern_validation)
            .field("format_validation", &self.format_validation)
            .field("trim_additional_properties", &self.trim_additional_properties)
            .field("unique_items", &self.unique_items.is_some())
            .field("error_formatter", &self.error_formatter.is_some())
            .finish()
    }
}

impl ValidationOptions {
    /// Neutral options: defaults on, fail-fast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for request payloads.
    pub fn request() -> Self {
        Self::default().direction(Direction::Request)
    }

    /// Options for response payloads.
    pub fn response() -> Self {
        Self::default().direction(Direction::Response)
    }

    /// Sets the direction.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Enables or disables multi-error mode.
    pub fn multi_error(mut self, enabled: bool) -> Self {
        self.multi_error = enabled;
        self
    }

    /// Enables or disables default injection.
    pub fn skip_defaults(mut self, skip: bool) -> Self {
        self.skip_defaults = skip;
        self
    }

    /// Stops rejecting `readOnly` properties in requests.
    pub fn exclude_read_only(mut self, exclude: bool) -> Self {
        self.exclude_read_only = exclude;
        self
    }

    /// Stops rejecting `writeOnly` properties in responses.
    pub fn exclude_write_only(mut self, exclude: bool) -> Self {
        self.exclude_write_only = exclude;
        self
    }

    /// Enables or disables `pattern` checks.
    pub fn pattern_validation(mut self, enabled: bool) -> Self {
        self.pattern_validation = enabled;
        self
    }

    /// Enables or disables `format` checks.
    pub fn format_validation(mut self, enabled: bool) -> Self {
        self.format_validation = enabled;
        self
    }

    /// Enables or disables trimming of undeclared properties.
    pub fn trim_additional_properties(mut self, enabled: bool) -> Self {
        self.trim_additional_properties = enabled;
        self
    }

    /// Installs a uniqueness check.
    pub fn unique_items_checker(
        mut self,
        checker: impl Fn(&[Value]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.unique_items = Some(Arc::new(checker));
        self
    }

    /// Installs an error formatter.
    pub fn error_formatter(
        mut self,
        formatter: impl Fn(&SchemaError) -> String + Send + Sync + 'static,
    ) -> Self {
        self.error_formatter = Some(Arc::new(formatter));
        self
    }

    /// Whether `readOnly` properties are rejected.
    pub(crate) fn rejects_read_only(&self) -> bool {
        self.direction == Direction::Request && !self.exclude_read_only
    }

    /// Whether `writeOnly` properties are rejected.
    pub(crate) fn rejects_write_only(&self) -> bool {
        self.direction == Direction::Response && !self.exclude_write_only
    }
}
