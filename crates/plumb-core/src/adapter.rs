//! Transport adapter contract.
//!
//! An [`Adapter`] is the boundary between a [`Conn`](crate::Conn) and
//! whatever transport produced it. Every method here is a suspension point;
//! everything else a connection does is a pure, synchronous transformation.
//!
//! Adapters report a peer disconnect with [`TransportError::Closed`]. The
//! connection surfaces that to the plug that was running, it is never
//! retried here.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failures reported by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer went away while an operation was in flight.
    #[error("connection closed by peer")]
    Closed,

    /// Any other transport-level failure.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// One read from the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyChunk {
    /// The final bytes of the body (possibly empty).
    Done(Bytes),
    /// Some bytes; more are available.
    More(Bytes),
}

/// The suspend-capable half of a connection.
///
/// Implementations own the request body stream and the response sink for a
/// single exchange. [`Adapter::release`] is called exactly once, when the
/// connection is dropped or a body read was aborted, and must free any
/// stream the adapter still holds.
pub trait Adapter: Send + Sync + 'static {
    /// Short adapter name used in logs.
    fn name(&self) -> &'static str;

    /// Writes a complete response.
    fn send_resp<'a>(
        &'a mut self,
        status: StatusCode,
        headers: &'a HeaderMap,
        body: Bytes,
    ) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Writes the status line and headers of a chunked response.
    fn send_chunked<'a>(
        &'a mut self,
        status: StatusCode,
        headers: &'a HeaderMap,
    ) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Writes one chunk of a chunked response.
    fn chunk(&mut self, data: Bytes) -> BoxFuture<'_, Result<(), TransportError>>;

    /// Reads at most `read_length` bytes of the request body.
    fn read_req_body(&mut self, read_length: usize)
        -> BoxFuture<'_, Result<BodyChunk, TransportError>>;

    /// Releases the request body stream and any other held resources.
    fn release(&mut self) {}
}
