//! Typed configuration for nomos.
//!
//! This crate provides strongly-typed configuration for validation hosts
//! with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`NomosConfig`] has two sections:
//!
//! - [`ValidationConfig`] - the sentinel switches, turned into
//!   [`Options`](nomos_sentinel::Options) by [`ValidationConfig::to_options`]
//! - [`LoggingConfig`] - turned into a
//!   [`LogConfig`](nomos_telemetry::LogConfig) by
//!   [`LoggingConfig::to_log_config`]
//!
//! The authenticator and a custom error formatter cannot be expressed in a
//! file and are attached to the sentinel in code.
//!
//! # Example
//!
//! ```no_run
//! use nomos_config::ConfigLoader;
//! use nomos_sentinel::Sentinel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("nomos.toml")?
//!     .with_env_prefix("NOMOS")
//!     .load()?;
//!
//! nomos_telemetry::init_logging(&config.logging.to_log_config())?;
//! let sentinel = Sentinel::builder()
//!     .options(config.validation.to_options())
//!     .build();
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [validation]
//! multi_error = true
//! include_response_status = true
//! exclude_request_query_params = false
//! trim_additional_properties = false
//! endpoint_type = "read"
//!
//! [logging]
//! level = "info,nomos_sentinel=debug"
//! format = "json"
//! include_location = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with variables of the form
//! `PREFIX__SECTION__KEY`:
//!
//! - `NOMOS__VALIDATION__MULTI_ERROR=true`
//! - `NOMOS__VALIDATION__ENDPOINT_TYPE=write`
//! - `NOMOS__LOGGING__FORMAT=pretty`

#![doc(html_root_url = "https://docs.rs/nomos-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::NomosConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{EndpointKind, LoggingConfig, ValidationConfig};
