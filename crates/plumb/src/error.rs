//! Dispatch errors.

use http::Method;
use plumb_core::ConnError;
use plumb_pipeline::PlugError;
use thiserror::Error;

/// Errors returned by [`Dispatcher::dispatch`](crate::Dispatcher::dispatch).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The root pipeline failed, or flushing the response did.
    #[error(transparent)]
    Plug(#[from] PlugError),

    /// The pipeline finished without staging or sending a response.
    #[error("no response was set for {method} {path}")]
    NoResponse {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
    },
}

impl From<ConnError> for DispatchError {
    fn from(err: ConnError) -> Self {
        Self::Plug(PlugError::Conn(err))
    }
}

impl DispatchError {
    /// Returns true if the peer went away while the response was written.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Plug(PlugError::Conn(err)) if err.is_closed())
    }
}
