//! # Plumb Router
//!
//! A router plug that dispatches connections to pipelines by method and
//! path.
//!
//! - [`Router`] - compiled, immutable rule set; itself a plug
//! - [`RouterBuilder`] - declares rules in priority order
//! - [`SwappableRouter`] - lock-free hot reload of a router
//! - [`Pattern`] - compiled route pattern
//! - [`RouteError`] - pattern compilation errors
//!
//! When several rules match, the one declared first wins.
//!
//! # Example
//!
//! ```rust
//! use http::StatusCode;
//! use plumb_core::Conn;
//! use plumb_pipeline::{Pipeline, PlugResult};
//! use plumb_router::Router;
//!
//! async fn list(mut conn: Conn) -> PlugResult {
//!     conn.send_resp(StatusCode::OK, "[]").await?;
//!     Ok(conn)
//! }
//!
//! async fn not_found(mut conn: Conn) -> PlugResult {
//!     conn.send_resp(StatusCode::NOT_FOUND, "").await?;
//!     Ok(conn)
//! }
//!
//! let list = Pipeline::builder().plug_fn("list", list).build().unwrap();
//! let missing = Pipeline::builder().plug_fn("not_found", not_found).build().unwrap();
//!
//! let router = Router::builder()
//!     .get("/users", list)
//!     .catch_all(missing)
//!     .build()
//!     .unwrap();
//!
//! let app = Pipeline::builder().plug(router, ()).build().unwrap();
//! assert_eq!(app.plug_names(), vec!["router"]);
//! ```
//!
//! # Architecture
//!
//! Rules are indexed by method, then by a trie with one level per path
//! segment. Every node keeps the smallest rule index below it, so lookups
//! skip subtrees that cannot beat the best match found so far:
//!
//! ```text
//!                 GET (root) min=0
//!                      │
//!           ┌──────────┴──────────┐
//!           │                     │
//!       "users" min=0          :any min=2
//!           │                     │
//!     ┌─────┴─────┐            (leaf #2)
//!     │           │
//! (leaf #0)   :any min=1
//!                 │
//!             (leaf #1)
//! ```

#![doc(html_root_url = "https://docs.rs/plumb-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod method_index;
mod node;
mod pattern;
mod router;
mod swap;

pub use error::RouteError;
pub use pattern::{Pattern, Segment};
pub use router::{RouteInfo, RouteKind, RouteMatch, Router, RouterBuilder, ROUTE_KEY};
pub use swap::SwappableRouter;
