//! Plug error types.

use http::Method;
use plumb_core::{Conn, ConnError};
use thiserror::Error;

/// Result of a plug call.
pub type PlugResult = Result<Conn, PlugError>;

/// Errors raised while building or running a pipeline.
#[derive(Debug, Error)]
pub enum PlugError {
    /// A connection operation failed.
    #[error(transparent)]
    Conn(#[from] ConnError),

    /// A plug returned a connection other than the one it was given.
    #[error("plug {plug} broke the plug contract: {reason}")]
    ContractViolation {
        /// Name of the offending plug.
        plug: String,
        /// What went wrong.
        reason: String,
    },

    /// A plug rejected its options at build time.
    #[error("plug {plug} failed to initialize: {reason}")]
    Init {
        /// Name of the plug.
        plug: String,
        /// Why initialization failed.
        reason: String,
    },

    /// No route matched and no catch-all was configured.
    ///
    /// Carries the connection so the caller can still respond.
    #[error("no route matches {method} {path}")]
    NoRoute {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
        /// The unrouted connection.
        conn: Box<Conn>,
    },

    /// Application failure inside a plug.
    ///
    /// May carry the connection, see [`PlugError::with_conn`].
    #[error("plug {plug} failed: {source}")]
    Internal {
        /// Name of the plug.
        plug: String,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
        /// The connection, if the plug handed it back.
        conn: Option<Box<Conn>>,
    },
}

impl PlugError {
    /// Creates an initialization error.
    pub fn init(plug: impl Into<String>, reason: impl ToString) -> Self {
        Self::Init {
            plug: plug.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps an application error raised by `plug`.
    pub fn internal(plug: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            plug: plug.into(),
            source: source.into(),
            conn: None,
        }
    }

    /// Attaches `conn` to an [`PlugError::Internal`] so the caller can still
    /// respond. Other errors are returned unchanged and `conn` is dropped.
    ///
    /// ```
    /// use plumb_core::Conn;
    /// use plumb_pipeline::{PlugError, PlugResult};
    ///
    /// async fn load(conn: Conn) -> PlugResult {
    ///     let failure = std::io::Error::other("database unavailable");
    ///     Err(PlugError::internal("load", failure).with_conn(conn))
    /// }
    /// ```
    #[must_use]
    pub fn with_conn(self, conn: Conn) -> Self {
        match self {
            Self::Internal { plug, source, .. } => Self::Internal {
                plug,
                source,
                conn: Some(Box::new(conn)),
            },
            other => other,
        }
    }

    /// Takes the connection carried by an [`PlugError::Internal`].
    pub fn take_conn(&mut self) -> Option<Conn> {
        match self {
            Self::Internal { conn, .. } => conn.take().map(|conn| *conn),
            _ => None,
        }
    }

    /// Creates a no-route error carrying `conn`.
    pub fn no_route(conn: Conn) -> Self {
        Self::NoRoute {
            method: conn.method().clone(),
            path: conn.request_path().to_string(),
            conn: Box::new(conn),
        }
    }

    /// Returns true for [`PlugError::NoRoute`].
    #[must_use]
    pub fn is_no_route(&self) -> bool {
        matches!(self, Self::NoRoute { .. })
    }

    /// Takes back the connection carried by a [`PlugError::NoRoute`].
    pub fn into_conn(self) -> Result<Conn, Self> {
        match self {
            Self::NoRoute { conn, .. } => Ok(*conn),
            other => Err(other),
        }
    }

    /// Applies `f` to the carried connection, if any.
    pub fn map_conn(self, f: impl FnOnce(&mut Conn)) -> Self {
        match self {
            Self::NoRoute {
                method,
                path,
                mut conn,
            } => {
                f(&mut conn);
                Self::NoRoute { method, path, conn }
            }
            Self::Internal {
                plug,
                source,
                conn: Some(mut conn),
            } => {
                f(&mut conn);
                Self::Internal {
                    plug,
                    source,
                    conn: Some(conn),
                }
            }
            other => other,
        }
    }
}
