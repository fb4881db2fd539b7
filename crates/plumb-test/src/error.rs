//! Test error types.

use thiserror::Error;

/// Errors that can occur during testing.
#[derive(Debug, Error)]
pub enum TestError {
    /// The test connection could not be built.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// A header name or value is invalid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The connection was not built by [`TestConn`](crate::TestConn).
    #[error("connection has no test recorder")]
    NoRecorder,

    /// Nothing was flushed to the adapter yet.
    #[error("no response was sent")]
    NotSent,

    /// The response body is not valid UTF-8.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
