//! Property tests for the schema validator.
//!
//! Values are drawn from a small JSON grammar and checked against a fixed
//! pool of schemas that covers every shape and composition keyword.

use nomos_core::{AdditionalProperties, Bound, Schema};
use nomos_schema::{SchemaValidator, ValidationOptions};
use proptest::prelude::*;
use serde_json::{json, Value};

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1000.0f64..1000.0).prop_map(|f| json!(f)),
        "[a-z0-9]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-e]", inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Schemas without defaults, so checking a value never changes it.
fn plain_schemas() -> Vec<Schema> {
    vec![
        Schema::any(),
        Schema::string().min_length(1),
        Schema::integer().minimum(Bound::inclusive(0.0)),
        Schema::number().maximum(Bound::exclusive(100.0)),
        Schema::boolean(),
        Schema::array(Schema::integer()).max_items(3),
        Schema::object().required_property("a", Schema::any()),
        Schema::object()
            .property("b", Schema::string())
            .additional_properties(AdditionalProperties::Forbidden),
        Schema::string().nullable(),
        Schema::one_of(vec![Schema::string(), Schema::integer()]),
        Schema::not(Schema::boolean()),
    ]
}

fn schema_index() -> impl Strategy<Value = usize> {
    0..plain_schemas().len()
}

fn defaulted_schema() -> Schema {
    Schema::object()
        .property("a", Schema::string().default_value(json!("x")))
        .property(
            "nested",
            Schema::object()
                .property("n", Schema::integer().default_value(json!(1)))
                .default_value(json!({})),
        )
        .property("list", Schema::array(Schema::integer().default_value(json!(0))))
}

fn validator() -> SchemaValidator {
    SchemaValidator::new(ValidationOptions::request())
}

proptest! {
    /// Validation is deterministic and leaves the schema untouched.
    #[test]
    fn validation_is_deterministic(index in schema_index(), value in json_value()) {
        let schema = plain_schemas().swap_remove(index);
        let before = schema.clone();

        let mut first = value.clone();
        let mut second = value.clone();
        let a = validator().validate(&schema, &mut first);
        let b = validator().validate(&schema, &mut second);

        prop_assert_eq!(a, b);
        prop_assert_eq!(first, second);
        prop_assert_eq!(schema, before);
    }

    /// `allOf(s1, s2)` accepts exactly what both `s1` and `s2` accept.
    #[test]
    fn all_of_is_conjunction(i in schema_index(), j in schema_index(), value in json_value()) {
        let s1 = plain_schemas().swap_remove(i);
        let s2 = plain_schemas().swap_remove(j);
        let both = Schema::all_of(vec![s1.clone(), s2.clone()]);

        let expected = validator().check(&s1, &value).is_ok() && validator().check(&s2, &value).is_ok();
        prop_assert_eq!(validator().check(&both, &value).is_ok(), expected);
    }

    /// `oneOf` without a discriminator accepts when exactly one branch does.
    #[test]
    fn one_of_needs_exactly_one(i in schema_index(), j in schema_index(), value in json_value()) {
        let s1 = plain_schemas().swap_remove(i);
        let s2 = plain_schemas().swap_remove(j);
        let either = Schema::one_of(vec![s1.clone(), s2.clone()]);

        let matches = usize::from(validator().check(&s1, &value).is_ok())
            + usize::from(validator().check(&s2, &value).is_ok());
        prop_assert_eq!(validator().check(&either, &value).is_ok(), matches == 1);
    }

    /// A second pass over an already defaulted value changes nothing.
    #[test]
    fn default_injection_is_idempotent(value in json_value()) {
        let schema = defaulted_schema();
        let mut once = value;
        if validator().validate(&schema, &mut once).is_ok() {
            let mut twice = once.clone();
            prop_assert!(validator().validate(&schema, &mut twice).is_ok());
            prop_assert_eq!(once, twice);
        }
    }

    /// Every `i64` is an `int64`.
    #[test]
    fn int64_accepts_i64(n in any::<i64>()) {
        let schema = Schema::integer().format("int64");
        prop_assert!(validator().check(&schema, &json!(n)).is_ok());
    }

    /// Anything past `i64::MAX` is rejected as an overflow.
    #[test]
    fn int64_rejects_overflow(excess in 1u64..u64::MAX) {
        let schema = Schema::integer().format("int64");
        let literal = (i128::from(i64::MAX) + i128::from(excess)).to_string();
        let value: Value = serde_json::from_str(&literal).unwrap();

        let violation = validator().check(&schema, &value).unwrap_err();
        prop_assert_eq!(violation.first().unwrap().reason.as_str(), "number must be an int64");
    }
}

#[test]
fn test_int64_literal_survives_validation() {
    let schema = Schema::object().property("testInteger", Schema::integer().format("int64"));
    let mut value: Value = serde_json::from_str(r#"{"testInteger": 9223372036854775807}"#).unwrap();

    validator().validate(&schema, &mut value).unwrap();
    assert_eq!(
        serde_json::to_string(&value).unwrap(),
        r#"{"testInteger":9223372036854775807}"#
    );
}

#[test]
fn test_int64_overflow_in_body() {
    let schema = Schema::object().property("testInteger", Schema::integer().format("int64"));
    let value: Value = serde_json::from_str(r#"{"testInteger": 9223372036854775808}"#).unwrap();

    let violation = validator().check(&schema, &value).unwrap_err();
    let error = violation.first().unwrap();
    assert_eq!(error.reason, "number must be an int64");
    assert_eq!(error.json_pointer(), "/testInteger");
}
