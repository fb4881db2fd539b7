//! # Plumb Pipeline
//!
//! The plug contract and ordered plug pipelines.
//!
//! - [`Plug`] - a unit of work with one-time `init` and per-request `call`
//! - [`FnPlug`] - a plug from an async function
//! - [`Pipeline`] - an immutable, ordered list of initialized plugs
//! - [`Forward`] - runs a nested pipeline under a path prefix
//! - [`PlugError`] - errors raised by plugs and pipelines
//!
//! ## Example
//!
//! ```
//! use http::StatusCode;
//! use plumb_core::Conn;
//! use plumb_pipeline::{Pipeline, PlugResult};
//!
//! async fn require_auth(mut conn: Conn) -> PlugResult {
//!     if conn.req_header("authorization").is_none() {
//!         conn.send_resp(StatusCode::UNAUTHORIZED, "").await?;
//!         conn.halt();
//!     }
//!     Ok(conn)
//! }
//!
//! async fn show(mut conn: Conn) -> PlugResult {
//!     conn.send_resp(StatusCode::OK, "secret").await?;
//!     Ok(conn)
//! }
//!
//! let api = Pipeline::builder()
//!     .plug_fn("require_auth", require_auth)
//!     .plug_fn("show", show)
//!     .build()
//!     .unwrap();
//!
//! let root = Pipeline::builder().forward("/api", api).build().unwrap();
//! assert_eq!(root.plug_names(), vec!["forward"]);
//! ```

#![doc(html_root_url = "https://docs.rs/plumb-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod forward;
mod pipeline;
mod plug;

pub use error::{PlugError, PlugResult};
pub use forward::{forward_to, Forward, ForwardOptions, ForwardTo};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use plug::{FnPlug, Plug};
