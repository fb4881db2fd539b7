//! Typed configuration for Plumb.
//!
//! This crate provides a strongly-typed configuration with:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`PlumbConfig`] holds every section:
//!
//! - [`QueryConfig`] - query string length and nesting limits
//! - [`BodyConfig`] - request body read limits
//! - [`DispatcherConfig`] - what happens to unmatched requests
//! - [`LogConfig`](plumb_telemetry::LogConfig) - logging
//!
//! # Configuration File Format
//!
//! ```toml
//! [query]
//! length = 1000000
//! depth = 32
//!
//! [body]
//! length = 8000000
//! read_length = 1000000
//!
//! [dispatcher]
//! unmatched = "not_found"   # or "error"
//!
//! [logging]
//! level = "info"
//! format = "json"           # or "pretty", "compact"
//! include_target = true
//! ```
//!
//! # Environment Variables
//!
//! With prefix `PLUMB`, keys map as `PLUMB__SECTION__KEY`:
//!
//! ```text
//! PLUMB__QUERY__LENGTH=4096
//! PLUMB__DISPATCHER__UNMATCHED=error
//! PLUMB__LOGGING__LEVEL=plumb_router=debug,info
//! ```

#![doc(html_root_url = "https://docs.rs/plumb-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{BodyConfig, DispatcherConfig, PlumbConfig, QueryConfig, UnmatchedPolicy};
pub use error::ConfigError;
pub use loader::ConfigLoader;
