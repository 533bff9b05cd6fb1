//! The schema walker.
//!
//! Each node is checked in a fixed order:
//!
//! ```text
//! null handling ─▶ trim ─▶ shape ─▶ enum ─▶ not ─▶ oneOf ─▶ anyOf ─▶ allOf
//! ```
//!
//! Defaults are written into the value while walking, so callers pass the
//! value mutably. Composition branches are first tried on a copy; only the
//! branch that is accepted runs again on the real value, which keeps defaults
//! of rejected branches out of the result.

use nomos_core::{
    AdditionalProperties, ArraySchema, Bound, Discriminator, NumberConstraints, ObjectSchema,
    Primitive, Schema, SchemaError, SchemaKind, SchemaViolation, StringConstraints,
};
use serde_json::{Map, Number, Value};
use tracing::{debug, trace};

use crate::compare::{all_unique, integer_value, is_integer, json_equal};
use crate::format;
use crate::options::{Direction, ValidationOptions};

/// Tolerance applied to `multipleOf`.
const MULTIPLE_OF_EPSILON: f64 = 1e-10;

type Outcome = Result<(), Vec<SchemaError>>;

/// Validates values against resolved schemas.
///
/// The validator holds only its options and is cheap to clone. Schemas are
/// never modified.
///
/// # Example
///
/// ```
/// use nomos_core::Schema;
/// use nomos_schema::{SchemaValidator, ValidationOptions};
/// use serde_json::json;
///
/// let schema = Schema::object()
///     .required_property("name", Schema::string())
///     .property("tag", Schema::string().default_value(json!("none")));
///
/// let mut value = json!({ "name": "rex" });
/// SchemaValidator::new(ValidationOptions::request())
///     .validate(&schema, &mut value)
///     .unwrap();
/// assert_eq!(value, json!({ "name": "rex", "tag": "none" }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    options: ValidationOptions,
}

impl SchemaValidator {
    /// Creates a validator.
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validates `value`, injecting defaults unless they are skipped.
    pub fn validate(&self, schema: &Schema, value: &mut Value) -> Result<(), SchemaViolation> {
        let outcome = self.visit(schema, value, &[], true);
        self.finish(outcome)
    }

    /// Validates a value without modifying it.
    pub fn check(&self, schema: &Schema, value: &Value) -> Result<(), SchemaViolation> {
        let mut copy = value.clone();
        self.validate(schema, &mut copy)
    }

    fn finish(&self, outcome: Outcome) -> Result<(), SchemaViolation> {
        let Err(mut errors) = outcome else {
            return Ok(());
        };
        if let Some(formatter) = &self.options.error_formatter {
            for error in &mut errors {
                error.message = Some(formatter(error));
            }
        }
        debug!(
            error_count = errors.len(),
            first = %errors.first().map(|e| e.reason.as_str()).unwrap_or_default(),
            "schema validation failed"
        );
        Err(into_violation(errors, self.options.multi_error))
    }

    // ------------------------------------------------------------------
    // Error collection
    // ------------------------------------------------------------------

    /// Records an error; in fail-fast mode returns every error so far.
    fn report(&self, errors: &mut Vec<SchemaError>, error: SchemaError) -> Outcome {
        errors.push(error);
        if self.options.multi_error {
            Ok(())
        } else {
            Err(std::mem::take(errors))
        }
    }

    /// Merges a nested outcome.
    fn merge(&self, errors: &mut Vec<SchemaError>, outcome: Outcome) -> Outcome {
        if let Err(nested) = outcome {
            errors.extend(nested);
            if !self.options.multi_error {
                return Err(std::mem::take(errors));
            }
        }
        Ok(())
    }

    fn done(errors: Vec<SchemaError>) -> Outcome {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // ------------------------------------------------------------------
    // Walk
    // ------------------------------------------------------------------

    fn visit(&self, schema: &Schema, value: &mut Value, path: &[String], trim: bool) -> Outcome {
        let mut errors = Vec::new();

        if value.is_null() {
            if schema.nullable {
                return Ok(());
            }
            let accepts_null = !schema.type_declared
                || matches!(schema.kind, SchemaKind::Primitive(Primitive::Null));
            if !accepts_null {
                return Err(vec![SchemaError::new(
                    Value::Null,
                    "nullable",
                    "Value is not nullable",
                    path.to_vec(),
                )]);
            }
        }

        if trim && self.options.trim_additional_properties {
            trim_undeclared(schema, value);
        }

        let shape = self.visit_shape(schema, value, path);
        self.merge(&mut errors, shape)?;

        if let Some(allowed) = &schema.enum_values {
            if !allowed.iter().any(|candidate| json_equal(candidate, value)) {
                let listed = Value::Array(allowed.clone());
                let error = SchemaError::new(
                    value.clone(),
                    "enum",
                    format!("value is not one of the allowed values {listed}"),
                    path.to_vec(),
                )
                .with_allowed_values(allowed.clone());
                self.report(&mut errors, error)?;
            }
        }

        if !schema.composition.is_empty() {
            let composition = self.visit_composition(schema, value, path);
            self.merge(&mut errors, composition)?;
        }

        Self::done(errors)
    }

    fn visit_shape(&self, schema: &Schema, value: &mut Value, path: &[String]) -> Outcome {
        // Untyped schemas constrain only values of the shape they describe.
        if !schema.type_declared && !shape_matches(&schema.kind, value) {
            return Ok(());
        }

        match (&schema.kind, value) {
            (SchemaKind::Any, _) => Ok(()),
            (SchemaKind::Primitive(Primitive::Null), Value::Null) => Ok(()),
            (SchemaKind::Primitive(Primitive::Boolean), Value::Bool(_)) => Ok(()),
            (SchemaKind::Primitive(Primitive::String(c)), Value::String(s)) => {
                self.visit_string(c, s, path)
            }
            (SchemaKind::Primitive(Primitive::Number(c)), Value::Number(n)) => {
                self.visit_number(c, n, false, path)
            }
            (SchemaKind::Primitive(Primitive::Integer(c)), Value::Number(n)) => {
                self.visit_number(c, n, true, path)
            }
            (SchemaKind::Array(a), Value::Array(items)) => self.visit_array(a, items, path),
            (SchemaKind::Object(o), Value::Object(map)) => self.visit_object(schema, o, map, path),
            (kind, value) => Err(vec![SchemaError::new(
                value.clone(),
                "type",
                format!("value must be {}", article_type(kind)),
                path.to_vec(),
            )]),
        }
    }

    fn visit_string(&self, c: &StringConstraints, s: &str, path: &[String]) -> Outcome {
        let mut errors = Vec::new();
        let fail = |reason: String, field: &'static str| {
            SchemaError::new(Value::String(s.to_string()), field, reason, path.to_vec())
        };

        let length = s.chars().count() as u64;
        if let Some(min) = c.min_length {
            if length < min {
                self.report(&mut errors, fail(format!("minimum string length is {min}"), "minLength"))?;
            }
        }
        if let Some(max) = c.max_length {
            if length > max {
                self.report(&mut errors, fail(format!("maximum string length is {max}"), "maxLength"))?;
            }
        }
        if let Some(pattern) = &c.pattern {
            if self.options.pattern_validation && !pattern.is_match(s) {
                let reason = format!(
                    "string doesn't match the regular expression \"{}\"",
                    pattern.as_str()
                );
                self.report(&mut errors, fail(reason, "pattern"))?;
            }
        }
        if let Some(name) = &c.format {
            if self.options.format_validation && !format::matches(name, s) {
                let reason = format!("string doesn't match the format \"{name}\"");
                self.report(&mut errors, fail(reason, "format"))?;
            }
        }
        Self::done(errors)
    }

    fn visit_number(
        &self,
        c: &NumberConstraints,
        n: &Number,
        integer: bool,
        path: &[String],
    ) -> Outcome {
        let mut errors = Vec::new();
        let fail = |reason: String, field: &'static str| {
            SchemaError::new(Value::Number(n.clone()), field, reason, path.to_vec())
        };

        let integral = is_integer(n);
        if integer && !integral {
            return Err(vec![fail("value must be an integer".into(), "type")]);
        }
        if let Some(format @ ("int32" | "int64")) = c.format.as_deref() {
            let fits = integer_value(n).is_some_and(|i| match format {
                "int32" => i32::try_from(i).is_ok(),
                _ => i64::try_from(i).is_ok(),
            });
            if !integral {
                self.report(&mut errors, fail("value must be an integer".into(), "format"))?;
            } else if !fits {
                self.report(&mut errors, fail(format!("number must be an {format}"), "format"))?;
            }
        }

        let Some(float) = n.as_f64() else {
            return Self::done(errors);
        };
        if let Some(Bound { value: min, exclusive }) = c.minimum {
            if exclusive && float <= min {
                self.report(&mut errors, fail(format!("number must be more than {min}"), "minimum"))?;
            } else if !exclusive && float < min {
                self.report(&mut errors, fail(format!("number must be at least {min}"), "minimum"))?;
            }
        }
        if let Some(Bound { value: max, exclusive }) = c.maximum {
            if exclusive && float >= max {
                self.report(&mut errors, fail(format!("number must be less than {max}"), "maximum"))?;
            } else if !exclusive && float > max {
                self.report(&mut errors, fail(format!("number must be at most {max}"), "maximum"))?;
            }
        }
        if let Some(divisor) = c.multiple_of {
            if divisor > 0.0 {
                let quotient = float / divisor;
                if (quotient - quotient.round()).abs() > MULTIPLE_OF_EPSILON {
                    let reason = format!("number must be a multiple of {divisor}");
                    self.report(&mut errors, fail(reason, "multipleOf"))?;
                }
            }
        }
        Self::done(errors)
    }

    fn visit_array(&self, a: &ArraySchema, items: &mut [Value], path: &[String]) -> Outcome {
        let mut errors = Vec::new();
        let len = items.len() as u64;
        let fail = |items: &[Value], reason: String, field: &'static str| {
            SchemaError::new(Value::Array(items.to_vec()), field, reason, path.to_vec())
        };

        if let Some(min) = a.min_items {
            if len < min {
                let error = fail(items, format!("minimum number of items is {min}"), "minItems");
                self.report(&mut errors, error)?;
            }
        }
        if let Some(max) = a.max_items {
            if len > max {
                let error = fail(items, format!("maximum number of items is {max}"), "maxItems");
                self.report(&mut errors, error)?;
            }
        }
        if a.unique_items {
            let unique = match &self.options.unique_items {
                Some(checker) => checker(&*items),
                None => all_unique(items),
            };
            if !unique {
                let error = fail(items, "duplicate items found".into(), "uniqueItems");
                self.report(&mut errors, error)?;
            }
        }

        if let Some(item_schema) = &a.items {
            for (index, item) in items.iter_mut().enumerate() {
                if item.is_null() && !item_schema.nullable && !self.options.skip_defaults {
                    if let Some(default) = item_schema.effective_default() {
                        *item = default.clone();
                    }
                }
                let outcome = self.visit(item_schema, item, &child(path, index.to_string()), true);
                self.merge(&mut errors, outcome)?;
            }
        }
        Self::done(errors)
    }

    fn visit_object(
        &self,
        schema: &Schema,
        o: &ObjectSchema,
        map: &mut Map<String, Value>,
        path: &[String],
    ) -> Outcome {
        let mut errors = Vec::new();

        if !self.options.skip_defaults {
            for (name, property) in &o.properties {
                if map.contains_key(name) || self.hidden(property) {
                    continue;
                }
                if let Some(default) = property.effective_default() {
                    trace!(property = %name, "injecting default");
                    map.insert(name.clone(), default.clone());
                }
            }
        }

        let count = map.len() as u64;
        if let Some(min) = o.min_properties {
            if count < min {
                let error = SchemaError::new(
                    Value::Object(map.clone()),
                    "minProperties",
                    format!("there must be at least {min} properties"),
                    path.to_vec(),
                );
                self.report(&mut errors, error)?;
            }
        }
        if let Some(max) = o.max_properties {
            if count > max {
                let error = SchemaError::new(
                    Value::Object(map.clone()),
                    "maxProperties",
                    format!("there must be at most {max} properties"),
                    path.to_vec(),
                );
                self.report(&mut errors, error)?;
            }
        }

        for (name, property) in &o.properties {
            let Some(value) = map.get_mut(name) else {
                continue;
            };
            let property_path = child(path, name.clone());
            if let Some(field) = self.access_violation(property) {
                let side = if field == "readOnly" { "request" } else { "response" };
                let error = SchemaError::new(
                    value.clone(),
                    field,
                    format!("{field} property \"{name}\" in {side}"),
                    property_path.clone(),
                );
                self.report(&mut errors, error)?;
            }
            let outcome = self.visit(property, value, &property_path, true);
            self.merge(&mut errors, outcome)?;
        }

        for name in &o.required {
            if map.contains_key(name) {
                continue;
            }
            if o.properties.get(name).is_some_and(|p| self.hidden(p)) {
                continue;
            }
            let error = SchemaError::new(
                Value::Object(map.clone()),
                "required",
                format!("property \"{name}\" is missing"),
                child(path, name.clone()),
            );
            self.report(&mut errors, error)?;
        }

        let undeclared: Vec<String> = map
            .keys()
            .filter(|key| !schema.declares_property(key))
            .cloned()
            .collect();
        match &o.additional_properties {
            AdditionalProperties::Forbidden => {
                for key in undeclared {
                    let value = map.get(&key).cloned().unwrap_or(Value::Null);
                    let error = SchemaError::new(
                        value,
                        "additionalProperties",
                        format!("property \"{key}\" is unsupported"),
                        child(path, key),
                    );
                    self.report(&mut errors, error)?;
                }
            }
            AdditionalProperties::Schema(additional) => {
                for key in undeclared {
                    if let Some(value) = map.get_mut(&key) {
                        let outcome = self.visit(additional, value, &child(path, key), true);
                        self.merge(&mut errors, outcome)?;
                    }
                }
            }
            AdditionalProperties::Unspecified | AdditionalProperties::Allowed => {}
        }

        Self::done(errors)
    }

    /// Whether a property must not appear in the current direction, which
    /// also exempts it from `required` and default injection.
    fn hidden(&self, property: &Schema) -> bool {
        match self.options.direction {
            Direction::Request => property.read_only,
            Direction::Response => property.write_only,
            Direction::Neutral => false,
        }
    }

    fn access_violation(&self, property: &Schema) -> Option<&'static str> {
        if property.read_only && self.options.rejects_read_only() {
            Some("readOnly")
        } else if property.write_only && self.options.rejects_write_only() {
            Some("writeOnly")
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    fn visit_composition(&self, schema: &Schema, value: &mut Value, path: &[String]) -> Outcome {
        let mut errors = Vec::new();
        let composition = &schema.composition;

        if let Some(negated) = &composition.not {
            let mut trial = value.clone();
            if self.visit(negated, &mut trial, path, false).is_ok() {
                let error = SchemaError::new(
                    value.clone(),
                    "not",
                    "must not match the schema in \"not\"",
                    path.to_vec(),
                );
                self.report(&mut errors, error)?;
            }
        }

        if !composition.one_of.is_empty() {
            let outcome = match &schema.discriminator {
                Some(d) => self.visit_discriminated(&composition.one_of, d, value, path),
                None => self.visit_one_of(&composition.one_of, value, path),
            };
            self.merge(&mut errors, outcome)?;
        }

        if !composition.any_of.is_empty() {
            let outcome = match &schema.discriminator {
                Some(d) => self.visit_discriminated(&composition.any_of, d, value, path),
                None => self.visit_any_of(&composition.any_of, value, path),
            };
            self.merge(&mut errors, outcome)?;
        }

        if !composition.all_of.is_empty() {
            let outcome = self.visit_all_of(&composition.all_of, value, path);
            self.merge(&mut errors, outcome)?;
        }

        Self::done(errors)
    }

    fn visit_discriminated(
        &self,
        branches: &[Schema],
        discriminator: &Discriminator,
        value: &mut Value,
        path: &[String],
    ) -> Outcome {
        let property = &discriminator.property_name;
        let fail = |value: &Value, reason: String| {
            Err(vec![SchemaError::new(
                value.clone(),
                "discriminator",
                reason,
                path.to_vec(),
            )])
        };

        let selector = match value.get(property) {
            None => {
                return fail(
                    value,
                    format!("input does not contain the discriminator property \"{property}\""),
                )
            }
            Some(Value::String(selector)) => selector.clone(),
            Some(_) => {
                return fail(
                    value,
                    format!("value of discriminator property \"{property}\" must be a string"),
                )
            }
        };

        let target = discriminator.resolve(&selector);
        match branches.iter().find(|b| b.name.as_deref() == Some(target)) {
            Some(branch) => self.visit(branch, value, path, false),
            None => fail(
                value,
                format!("discriminator property \"{property}\" has invalid value \"{selector}\""),
            ),
        }
    }

    fn visit_one_of(&self, branches: &[Schema], value: &mut Value, path: &[String]) -> Outcome {
        let mut matched = Vec::new();
        let mut failures = Vec::new();
        for (index, branch) in branches.iter().enumerate() {
            let mut trial = value.clone();
            match self.visit(branch, &mut trial, path, false) {
                Ok(()) => matched.push(index),
                Err(errors) => failures.extend(errors),
            }
        }

        match matched.as_slice() {
            [] => Err(vec![SchemaError::new(
                value.clone(),
                "oneOf",
                "doesn't match any schema from \"oneOf\"",
                path.to_vec(),
            )
            .with_origin(into_violation(failures, self.options.multi_error))]),
            [index] => self.visit(&branches[*index], value, path, false),
            _ => Err(vec![SchemaError::new(
                value.clone(),
                "oneOf",
                "input matches more than one oneOf schemas",
                path.to_vec(),
            )]),
        }
    }

    fn visit_any_of(&self, branches: &[Schema], value: &mut Value, path: &[String]) -> Outcome {
        let mut failures = Vec::new();
        for branch in branches {
            let mut trial = value.clone();
            match self.visit(branch, &mut trial, path, false) {
                Ok(()) => return self.visit(branch, value, path, false),
                Err(errors) => failures.extend(errors),
            }
        }
        Err(vec![SchemaError::new(
            value.clone(),
            "anyOf",
            "doesn't match any schema from \"anyOf\"",
            path.to_vec(),
        )
        .with_origin(into_violation(failures, self.options.multi_error))])
    }

    /// Each branch sees the value as it arrived. Defaults injected by
    /// passing branches are merged back afterwards, earlier branches first.
    fn visit_all_of(&self, branches: &[Schema], value: &mut Value, path: &[String]) -> Outcome {
        let original = value.clone();
        let mut failures = Vec::new();
        for branch in branches {
            let mut copy = original.clone();
            match self.visit(branch, &mut copy, path, false) {
                Ok(()) => merge_injected(value, copy),
                Err(errors) => {
                    failures.extend(errors);
                    if !self.options.multi_error {
                        break;
                    }
                }
            }
        }
        if failures.is_empty() {
            return Ok(());
        }
        Err(vec![SchemaError::new(
            value.clone(),
            "allOf",
            "doesn't match all schemas from \"allOf\"",
            path.to_vec(),
        )
        .with_origin(into_violation(failures, self.options.multi_error))])
    }
}

fn into_violation(mut errors: Vec<SchemaError>, multi: bool) -> SchemaViolation {
    if !multi && errors.len() == 1 {
        if let Some(error) = errors.pop() {
            return error.into();
        }
    }
    SchemaViolation::Multi(errors.into())
}

/// Copies entries `produced` has and `target` lacks, and fills `null`s that
/// received a default. Existing entries win.
fn merge_injected(target: &mut Value, produced: Value) {
    match (target, produced) {
        (target @ Value::Null, produced) => *target = produced,
        (Value::Object(target), Value::Object(produced)) => {
            for (key, value) in produced {
                match target.get_mut(&key) {
                    Some(existing) => merge_injected(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(produced)) if target.len() == produced.len() => {
            for (existing, value) in target.iter_mut().zip(produced) {
                merge_injected(existing, value);
            }
        }
        _ => {}
    }
}

fn child(path: &[String], segment: impl Into<String>) -> Vec<String> {
    let mut path = path.to_vec();
    path.push(segment.into());
    path
}

fn shape_matches(kind: &SchemaKind, value: &Value) -> bool {
    match (kind, value) {
        (SchemaKind::Any, _)
        | (SchemaKind::Primitive(Primitive::String(_)), Value::String(_))
        | (SchemaKind::Primitive(Primitive::Number(_) | Primitive::Integer(_)), Value::Number(_))
        | (SchemaKind::Primitive(Primitive::Boolean), Value::Bool(_))
        | (SchemaKind::Primitive(Primitive::Null), Value::Null)
        | (SchemaKind::Array(_), Value::Array(_))
        | (SchemaKind::Object(_), Value::Object(_)) => true,
        _ => false,
    }
}

fn article_type(kind: &SchemaKind) -> &'static str {
    match kind {
        SchemaKind::Any => "any value",
        SchemaKind::Primitive(Primitive::String(_)) => "a string",
        SchemaKind::Primitive(Primitive::Number(_)) => "a number",
        SchemaKind::Primitive(Primitive::Integer(_)) => "an integer",
        SchemaKind::Primitive(Primitive::Boolean) => "a boolean",
        SchemaKind::Primitive(Primitive::Null) => "null",
        SchemaKind::Array(_) => "an array",
        SchemaKind::Object(_) => "an object",
    }
}

/// Removes properties no schema in the tree declares, unless the object
/// explicitly admits additional properties.
fn trim_undeclared(schema: &Schema, value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };
    let describes_object = schema.as_object().is_some()
        || schema.composition.branches().any(|b| b.as_object().is_some());
    if !describes_object {
        return;
    }
    let admits_more = matches!(
        schema.as_object().map(|o| &o.additional_properties),
        Some(AdditionalProperties::Allowed | AdditionalProperties::Schema(_))
    );
    if !admits_more {
        map.retain(|key, _| schema.declares_property(key));
    }
}
