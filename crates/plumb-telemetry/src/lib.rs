//! # Plumb Telemetry
//!
//! Structured logging for services built on Plumb.
//!
//! Every Plumb crate logs through [`tracing`]; this crate installs the
//! subscriber that turns those events into output:
//!
//! - [`LogConfig`] - level, output format and field options
//! - [`LogFormat`] - `json`, `pretty` or `compact`
//! - [`init_logging`] - installs the global subscriber
//! - [`create_env_filter`] - parses a filter directive
//!
//! # Example
//!
//! ```rust,no_run
//! use plumb_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).expect("logging");
//! tracing::info!(routes = 12, "router compiled");
//! ```

#![doc(html_root_url = "https://docs.rs/plumb-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
