//! The dispatcher: entry point for a host transport.
//!
//! A host builds a [`Conn`] per request and hands it to
//! [`Dispatcher::dispatch`], which runs the root pipeline and makes sure a
//! response reaches the transport.

use crate::error::DispatchError;
use arc_swap::ArcSwap;
use http::{Method, StatusCode, Uri};
use plumb_config::{PlumbConfig, UnmatchedPolicy};
use plumb_core::{
    Conn, ConnBuilder, ConnState, ReadBodyOptions, DEFAULT_QUERY_DEPTH, DEFAULT_QUERY_LENGTH,
};
use plumb_pipeline::{Pipeline, PlugError};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Runs the root pipeline for each connection.
///
/// Cloning is cheap; clones share the root pipeline, so a
/// [`reload`](Dispatcher::reload) through any clone affects all of them.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use plumb::prelude::*;
///
/// async fn hello(mut conn: Conn) -> PlugResult {
///     conn.resp(StatusCode::OK, "hello")?;
///     Ok(conn)
/// }
///
/// let hello = Pipeline::builder().plug_fn("hello", hello).build().unwrap();
/// let router = Router::builder().get("/", hello).build().unwrap();
/// let root = Pipeline::builder().plug(router, ()).build().unwrap();
///
/// let dispatcher = Dispatcher::new(root);
/// assert_eq!(dispatcher.unmatched(), UnmatchedPolicy::NotFound);
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    root: Arc<ArcSwap<Pipeline>>,
    unmatched: UnmatchedPolicy,
    query_length: usize,
    query_depth: usize,
    body: ReadBodyOptions,
}

impl Dispatcher {
    /// Creates a dispatcher with default settings.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            root: Arc::new(ArcSwap::from_pointee(pipeline)),
            unmatched: UnmatchedPolicy::default(),
            query_length: DEFAULT_QUERY_LENGTH,
            query_depth: DEFAULT_QUERY_DEPTH,
            body: ReadBodyOptions::default(),
        }
    }

    /// Creates a dispatcher using the limits and policy in `config`.
    #[must_use]
    pub fn from_config(pipeline: Pipeline, config: &PlumbConfig) -> Self {
        Self {
            unmatched: config.dispatcher.unmatched,
            query_length: config.query.length,
            query_depth: config.query.depth,
            body: config.body.read_options(),
            ..Self::new(pipeline)
        }
    }

    /// Sets the policy for requests no route matched.
    #[must_use]
    pub fn with_unmatched(mut self, policy: UnmatchedPolicy) -> Self {
        self.unmatched = policy;
        self
    }

    /// The policy for requests no route matched.
    #[must_use]
    pub fn unmatched(&self) -> UnmatchedPolicy {
        self.unmatched
    }

    /// Body read limits for handlers, from the configuration.
    #[must_use]
    pub fn body_options(&self) -> ReadBodyOptions {
        self.body
    }

    /// Starts a connection builder carrying the configured query and body
    /// limits.
    pub fn conn_builder(&self, method: Method, uri: Uri) -> ConnBuilder {
        ConnBuilder::new(method, uri)
            .query_length(self.query_length)
            .query_depth(self.query_depth)
            .body_options(self.body)
    }

    /// Returns the current root pipeline.
    #[must_use]
    pub fn pipeline(&self) -> Arc<Pipeline> {
        self.root.load_full()
    }

    /// Replaces the root pipeline for subsequent dispatches.
    ///
    /// Connections already running keep the pipeline they started with.
    /// Returns the previous pipeline.
    pub fn reload(&self, pipeline: Pipeline) -> Arc<Pipeline> {
        let plugs = pipeline.len();
        let old = self.root.swap(Arc::new(pipeline));
        info!(plugs, "root pipeline reloaded");
        old
    }

    /// Runs `conn` through the root pipeline and flushes its response.
    ///
    /// 1. A [`PlugError::NoRoute`] becomes `404 Not Found` under
    ///    [`UnmatchedPolicy::NotFound`] and is returned under
    ///    [`UnmatchedPolicy::Error`].
    /// 2. A response staged with `resp` but not sent is sent.
    /// 3. A connection with no response at all fails with
    ///    [`DispatchError::NoResponse`].
    /// 4. Any other error is returned. If it carries the connection (see
    ///    [`PlugError::with_conn`]) and nothing was sent yet, a
    ///    `500 Internal Server Error` is sent first.
    pub async fn dispatch(&self, conn: Conn) -> Result<Conn, DispatchError> {
        let span = info_span!(
            "dispatch",
            conn_id = %conn.id(),
            method = %conn.method(),
            path = %conn.request_path(),
        );
        self.dispatch_inner(conn).instrument(span).await
    }

    async fn dispatch_inner(&self, conn: Conn) -> Result<Conn, DispatchError> {
        let pipeline = self.root.load_full();

        let mut conn = match pipeline.run(conn).await {
            Ok(conn) => conn,
            Err(err) => self.recover(err).await?,
        };

        match conn.state() {
            ConnState::Unset => {
                warn!("pipeline finished without a response");
                return Err(DispatchError::NoResponse {
                    method: conn.method().clone(),
                    path: conn.request_path().to_string(),
                });
            }
            ConnState::Set => {
                conn.send().await?;
            }
            ConnState::Sent | ConnState::Chunked => {}
        }

        debug!(
            status = conn.status().map(|s| s.as_u16()),
            halted = conn.halted(),
            "dispatched"
        );
        Ok(conn)
    }

    async fn recover(&self, err: PlugError) -> Result<Conn, DispatchError> {
        if err.is_no_route() && self.unmatched == UnmatchedPolicy::NotFound {
            let mut conn = err.into_conn()?;
            debug!("no route matched, sending 404");
            conn.put_resp_content_type("text/plain")?;
            conn.send_resp(StatusCode::NOT_FOUND, "Not Found").await?;
            return Ok(conn);
        }

        let mut err = err;
        debug!(error = %err, "pipeline failed");
        if let Some(mut conn) = err.take_conn() {
            if !conn.state().is_terminal() {
                if let Err(send_err) = send_error(&mut conn).await {
                    warn!(error = %send_err, "could not send 500 response");
                }
            }
        }
        Err(err.into())
    }
}

async fn send_error(conn: &mut Conn) -> Result<(), plumb_core::ConnError> {
    conn.put_resp_content_type("text/plain")?;
    conn.send_resp(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        .await?;
    Ok(())
}
