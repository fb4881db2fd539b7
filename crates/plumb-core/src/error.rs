//! Connection error types.

use crate::adapter::TransportError;
use crate::query::QueryError;
use crate::state::ConnState;
use thiserror::Error;

/// Result alias for connection operations.
pub type ConnResult<T> = Result<T, ConnError>;

/// Errors raised by [`Conn`](crate::Conn) operations.
///
/// A failing operation never applies part of its change. This includes
/// transport failures: `send`, `send_resp` and `send_chunked` put back the
/// status, headers, body, state and before-send callbacks they started with.
#[derive(Debug, Error)]
pub enum ConnError {
    /// The response was already flushed to the transport.
    #[error("the response was already sent (state: {state})")]
    AlreadySent {
        /// State the connection was in.
        state: ConnState,
    },

    /// A chunk was written outside of a chunked response.
    #[error("cannot write a chunk while the connection is {state}")]
    NotChunked {
        /// State the connection was in.
        state: ConnState,
    },

    /// `send` was called with no staged response.
    #[error("no response has been staged with resp()")]
    NothingStaged,

    /// A header name or value could not be represented.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The query string could not be decoded.
    #[error(transparent)]
    InvalidQuery(#[from] QueryError),

    /// `forward` was asked to consume segments that `path_info` does not start with.
    #[error("path_info {path_info:?} does not start with {prefix:?}")]
    PathMismatch {
        /// Segments that were to be consumed.
        prefix: Vec<String>,
        /// The remaining path at the time of the call.
        path_info: Vec<String>,
    },

    /// The transport failed or the peer disconnected.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ConnError {
    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the peer disconnected.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Closed))
    }
}
