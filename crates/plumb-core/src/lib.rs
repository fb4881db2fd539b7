//! # Plumb Core
//!
//! The connection context shared by every Plumb crate.
//!
//! - [`Conn`] - one request/response exchange, with its response state machine
//! - [`ConnBuilder`] - builds a connection from raw request data
//! - [`Adapter`] - the transport boundary; the only place a connection suspends
//! - [`PathParams`] - captures bound by routers
//! - [`QueryParams`] - lazily decoded query string
//! - [`ConnError`] - errors raised by connection operations
//!
//! A connection moves through [`ConnState`] in one direction only:
//! `Unset -> Set -> Sent`, or straight to `Chunked`. Once it is `Sent` or
//! `Chunked`, every operation touching status, headers or body fails with
//! [`ConnError::AlreadySent`].

#![doc(html_root_url = "https://docs.rs/plumb-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod adapter;
mod assigns;
mod body;
mod conn;
mod error;
mod id;
mod params;
pub mod query;
mod state;

pub use adapter::{Adapter, BodyChunk, BoxFuture, TransportError};
pub use assigns::Assigns;
pub use body::{BodyRead, ReadBodyOptions, DEFAULT_BODY_LENGTH, DEFAULT_READ_LENGTH};
pub use conn::{
    split_path, BeforeSend, Conn, ConnBuilder, PathMark, DEFAULT_HOST, DEFAULT_QUERY_LENGTH,
};
pub use error::{ConnError, ConnResult};
pub use id::ConnId;
pub use params::{ParamValue, PathParams};
pub use query::{QueryError, QueryParams, QueryValue, DEFAULT_QUERY_DEPTH};
pub use state::{ConnState, ResponseBody};
