//! Request body reading.

use bytes::Bytes;

/// Default maximum number of bytes returned by one `read_body` call.
pub const DEFAULT_BODY_LENGTH: usize = 8_000_000;

/// Default number of bytes requested from the adapter per read.
pub const DEFAULT_READ_LENGTH: usize = 1_000_000;

/// Limits for [`Conn::read_body`](crate::Conn::read_body).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBodyOptions {
    /// Once at least this many bytes were read and more remain, the read
    /// stops and returns [`BodyRead::Partial`].
    pub length: usize,
    /// Bytes requested from the adapter per underlying read.
    pub read_length: usize,
}

impl ReadBodyOptions {
    /// Creates options with the given limits.
    #[must_use]
    pub const fn new(length: usize, read_length: usize) -> Self {
        Self {
            length,
            read_length,
        }
    }
}

impl Default for ReadBodyOptions {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_LENGTH, DEFAULT_READ_LENGTH)
    }
}

/// Outcome of a body read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRead {
    /// The whole remaining body.
    Complete(Bytes),
    /// The length limit was reached; call `read_body` again for the rest.
    Partial(Bytes),
}

impl BodyRead {
    /// Returns true if the body was read to the end.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Returns the bytes read, complete or not.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Complete(bytes) | Self::Partial(bytes) => bytes,
        }
    }
}
