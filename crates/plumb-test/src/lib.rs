//! # Plumb Test
//!
//! In-memory connections for testing plugs, pipelines and routers without a
//! network transport.
//!
//! - [`TestConn`] builds a [`Conn`](plumb_core::Conn) from a method, path,
//!   query pairs, headers and body
//! - [`TestAdapter`] records what the connection flushed and can simulate a
//!   peer disconnect
//! - [`sent_response`] reads the flushed response back, with assertion
//!   helpers
//!
//! ## Example
//!
//! ```
//! use http::StatusCode;
//! use plumb_test::{sent_response, TestConn};
//!
//! # tokio_test::block_on(async {
//! let mut conn = TestConn::get("/hello").build();
//! conn.resp(StatusCode::OK, "world").unwrap();
//! conn.send().await.unwrap();
//!
//! sent_response(&conn)
//!     .unwrap()
//!     .assert_status(StatusCode::OK)
//!     .assert_body_eq("world");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/plumb-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod adapter;
mod conn;
mod error;
mod response;

pub use adapter::{Disconnect, Recorder, Recording, TestAdapter, RECORDER_KEY};
pub use conn::TestConn;
pub use error::TestError;
pub use response::{sent_response, SentResponse};
