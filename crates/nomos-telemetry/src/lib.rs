//! Logging and metrics for nomos.
//!
//! - **Logging**: a `tracing-subscriber` registry with an env filter and a
//!   JSON, pretty or compact fmt layer ([`init_logging`])
//! - **Metrics**: validation counters recorded through the `metrics` facade
//!   ([`metrics::record_validation`], [`metrics::record_validation_failure`])
//!
//! ```text
//!   nomos-sentinel ──tracing::debug!/warn!──▶ subscriber (init_logging)
//!         │
//!         └──────metrics::counter!─────────▶ host recorder (e.g. Prometheus)
//! ```
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `nomos_validations_total` | Counter | `direction`, `outcome` | Validations run |
//! | `nomos_validation_failures_total` | Counter | `stage` | Failures by stage |
//!
//! With a Prometheus recorder installed the counters render as:
//!
//! ```text
//! # HELP nomos_validations_total Total number of request and response validations by outcome
//! # TYPE nomos_validations_total counter
//! nomos_validations_total{direction="request",outcome="valid"} 1234
//! nomos_validations_total{direction="request",outcome="invalid"} 56
//! ```

#![doc(html_root_url = "https://docs.rs/nomos-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{describe_metrics, record_validation, record_validation_failure, Outcome};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
