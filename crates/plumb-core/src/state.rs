//! Response state machine.

use bytes::Bytes;
use std::fmt;

/// Where a connection is in its response lifecycle.
///
/// Transitions only move forward:
///
/// ```text
/// Unset ──► Set ──► Sent
///   │        │
///   └────────┴────► Chunked
/// ```
///
/// `Sent` and `Chunked` are terminal; once reached, status, headers and body
/// can no longer change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnState {
    /// Nothing staged yet.
    #[default]
    Unset,
    /// Status and body staged with `resp`, not yet flushed.
    Set,
    /// A full response was flushed.
    Sent,
    /// A chunked response was started.
    Chunked,
}

impl ConnState {
    /// Returns true once the response has reached the transport.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Chunked)
    }

    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Set => "set",
            Self::Sent => "sent",
            Self::Chunked => "chunked",
        }
    }
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The response body held by a connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseBody {
    /// No body staged.
    #[default]
    Empty,
    /// A complete body.
    Full(Bytes),
    /// Body is streamed chunk by chunk through the adapter.
    Chunked,
}

impl ResponseBody {
    /// Returns the body bytes if a full body is staged or sent.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Full(bytes) => Some(bytes),
            _ => None,
        }
    }
}
