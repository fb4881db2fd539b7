//! The plug contract.
//!
//! A plug is a unit of work over a [`Conn`]. It is configured once with
//! [`Plug::init`] when a pipeline is built, and called once per request
//! with the options `init` produced.
//!
//! # Example
//!
//! ```
//! use http::StatusCode;
//! use plumb_core::{BoxFuture, Conn};
//! use plumb_pipeline::{Plug, PlugError, PlugResult};
//!
//! /// Rejects requests without an `authorization` header.
//! struct RequireAuth;
//!
//! impl Plug for RequireAuth {
//!     type Raw = &'static str;
//!     type Options = String;
//!
//!     fn init(&self, realm: &'static str) -> Result<String, PlugError> {
//!         if realm.is_empty() {
//!             return Err(PlugError::init("RequireAuth", "realm must not be empty"));
//!         }
//!         Ok(format!("Basic realm=\"{realm}\""))
//!     }
//!
//!     fn call<'a>(&'a self, mut conn: Conn, challenge: &'a String) -> BoxFuture<'a, PlugResult> {
//!         Box::pin(async move {
//!             if conn.req_header("authorization").is_none() {
//!                 conn.put_resp_header("www-authenticate", challenge)?;
//!                 conn.send_resp(StatusCode::UNAUTHORIZED, "").await?;
//!                 conn.halt();
//!             }
//!             Ok(conn)
//!         })
//!     }
//! }
//! ```

use crate::error::{PlugError, PlugResult};
use plumb_core::{BoxFuture, Conn};
use std::future::Future;
use std::marker::PhantomData;

/// A composable unit of connection processing.
///
/// # Contract
///
/// - `init` is pure: it sees only the raw options, never a connection, and
///   runs exactly once per occurrence in a pipeline
/// - `call` MUST return the connection it was given, possibly updated; a
///   pipeline reports any other connection as a contract violation
/// - `call` halts the pipeline with [`Conn::halt`], never by returning early
///   with an error
pub trait Plug: Send + Sync + 'static {
    /// Options as written by the pipeline author.
    type Raw;

    /// Options prepared by `init`, shared by every call.
    type Options: Send + Sync + 'static;

    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Prepares options at build time.
    fn init(&self, raw: Self::Raw) -> Result<Self::Options, PlugError>;

    /// Processes one connection.
    fn call<'a>(&'a self, conn: Conn, opts: &'a Self::Options) -> BoxFuture<'a, PlugResult>;
}

/// A plug created from an async function.
///
/// Its `init` is the identity; each call receives a clone of the options.
///
/// # Example
///
/// ```
/// use plumb_core::Conn;
/// use plumb_pipeline::{FnPlug, PlugResult};
///
/// async fn tag(mut conn: Conn, value: &'static str) -> PlugResult {
///     conn.assign("tag", value);
///     Ok(conn)
/// }
///
/// let plug: FnPlug<_, &'static str> = FnPlug::new("tag", tag);
/// ```
pub struct FnPlug<F, O = ()> {
    name: &'static str,
    func: F,
    _options: PhantomData<fn() -> O>,
}

impl<F, O> FnPlug<F, O> {
    /// Creates a function plug.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self {
            name,
            func,
            _options: PhantomData,
        }
    }
}

impl<F, Fut, O> Plug for FnPlug<F, O>
where
    F: Fn(Conn, O) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PlugResult> + Send + 'static,
    O: Clone + Send + Sync + 'static,
{
    type Raw = O;
    type Options = O;

    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&self, raw: O) -> Result<O, PlugError> {
        Ok(raw)
    }

    fn call<'a>(&'a self, conn: Conn, opts: &'a O) -> BoxFuture<'a, PlugResult> {
        Box::pin((self.func)(conn, opts.clone()))
    }
}

/// A plug bound to the options its `init` produced.
pub(crate) trait Unit: Send + Sync {
    fn name(&self) -> &'static str;

    fn call(&self, conn: Conn) -> BoxFuture<'_, PlugResult>;
}

pub(crate) struct Initialized<P: Plug> {
    plug: P,
    options: P::Options,
}

impl<P: Plug> Initialized<P> {
    pub(crate) fn new(plug: P, raw: P::Raw) -> Result<Self, PlugError> {
        let options = plug.init(raw)?;
        Ok(Self { plug, options })
    }
}

impl<P: Plug> Unit for Initialized<P> {
    fn name(&self) -> &'static str {
        self.plug.name()
    }

    fn call(&self, conn: Conn) -> BoxFuture<'_, PlugResult> {
        self.plug.call(conn, &self.options)
    }
}
