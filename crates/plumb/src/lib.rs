//! # Plumb
//!
//! **Composable connection pipelines and routing**
//!
//! Plumb models one HTTP request/response exchange as a [`Conn`] value that
//! flows through an ordered pipeline of plugs:
//!
//! - **Connection context** - request data, a staged response, and a
//!   one-way `unset -> set -> sent` state machine
//! - **Plugs** - units with a one-time `init` and a per-request `call`
//! - **Pipelines** - immutable, nestable plug sequences that stop on halt
//! - **Router** - method and path dispatch where the earliest rule wins
//! - **Dispatcher** - runs the root pipeline and flushes the response
//!
//! ## Quick Start
//!
//! ```rust
//! use http::StatusCode;
//! use plumb::prelude::*;
//!
//! async fn show_user(mut conn: Conn) -> PlugResult {
//!     let id = conn.path_params().segment("id").unwrap_or_default().to_string();
//!     conn.put_resp_content_type("text/plain")?;
//!     conn.send_resp(StatusCode::OK, format!("user {id}")).await?;
//!     Ok(conn)
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let show_user = Pipeline::builder().plug_fn("show_user", show_user).build()?;
//! let router = Router::builder().get("/users/:id", show_user).build()?;
//! let root = Pipeline::builder().plug(router, ()).build()?;
//!
//! let dispatcher = Dispatcher::new(root);
//! // A host adapter builds a `Conn` per request and calls
//! // `dispatcher.dispatch(conn).await`.
//! # let _ = dispatcher;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! host adapter ─► Dispatcher ─► root Pipeline ─► Plug ─► Plug ─► Router
//!                     │                                             │
//!                     │                          ┌──────────────────┤
//!                     │                          ▼                  ▼
//!                     │                  rule Pipeline         catch-all
//!                     ▼
//!           404 / flush staged response / NoResponse
//! ```

#![doc(html_root_url = "https://docs.rs/plumb/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatcher;
mod error;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;

// Re-export core types
pub use plumb_core as core;

// Re-export pipeline types
pub use plumb_pipeline as pipeline;

// Re-export router types
pub use plumb_router as router;

// Re-export configuration types
pub use plumb_config as config;

// Re-export telemetry setup
pub use plumb_telemetry as telemetry;

pub use plumb_core::Conn;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use plumb::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{DispatchError, Dispatcher};

    pub use plumb_core::{
        Adapter, BoxFuture, Conn, ConnBuilder, ConnError, ConnResult, ConnState, ParamValue,
        PathParams, ReadBodyOptions,
    };

    pub use plumb_pipeline::{FnPlug, Pipeline, PipelineBuilder, Plug, PlugError, PlugResult};

    pub use plumb_router::{RouteInfo, Router, RouterBuilder, SwappableRouter, ROUTE_KEY};

    pub use plumb_config::{ConfigLoader, PlumbConfig, UnmatchedPolicy};

    pub use plumb_telemetry::{init_logging, LogConfig};
}
