//! Validation metrics.
//!
//! Counters are recorded through the `metrics` facade. Installing a recorder
//! (Prometheus or otherwise) is up to the host; without one every call is a
//! no-op.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `nomos_validations_total` | Counter | `direction`, `outcome` | Validations run |
//! | `nomos_validation_failures_total` | Counter | `stage` | Failures by stage |
//!
//! # Example
//!
//! ```rust,ignore
//! use nomos_telemetry::metrics::{record_validation, Outcome};
//!
//! record_validation("request", Outcome::Valid);
//! ```

use metrics::{counter, describe_counter};

/// Name of the validation counter.
pub const VALIDATIONS_TOTAL: &str = "nomos_validations_total";

/// Name of the failure counter.
pub const VALIDATION_FAILURES_TOTAL: &str = "nomos_validation_failures_total";

/// Result label of a validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The message matched the document.
    Valid,
    /// The message was rejected.
    Invalid,
}

impl Outcome {
    /// Label value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        }
    }
}

/// Registers descriptions for the nomos metrics with the current recorder.
pub fn describe_metrics() {
    describe_counter!(
        VALIDATIONS_TOTAL,
        "Total number of request and response validations by outcome"
    );
    describe_counter!(
        VALIDATION_FAILURES_TOTAL,
        "Total number of validation failures by stage"
    );
}

/// Records a finished validation.
///
/// `direction` is `"request"` or `"response"`.
pub fn record_validation(direction: &'static str, outcome: Outcome) {
    counter!(
        VALIDATIONS_TOTAL,
        "direction" => direction,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Records a failure in one validation stage (e.g. `"parameters"`, `"body"`).
pub fn record_validation_failure(stage: &'static str) {
    counter!(VALIDATION_FAILURES_TOTAL, "stage" => stage).increment(1);
}
