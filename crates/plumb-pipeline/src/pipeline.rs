//! Ordered plug pipelines.
//!
//! A [`Pipeline`] is built once from an ordered list of plugs. Building runs
//! every plug's `init` exactly once and keeps the options it returns; running
//! the pipeline calls each plug in order with those options, stopping as soon
//! as the connection is halted.
//!
//! Pipelines are plugs themselves, so they nest.

use crate::error::{PlugError, PlugResult};
use crate::forward::{Forward, ForwardTo};
use crate::plug::{FnPlug, Initialized, Plug, Unit};
use plumb_core::{BoxFuture, Conn};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// An immutable, cheaply cloneable sequence of initialized plugs.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use plumb_core::Conn;
/// use plumb_pipeline::{Pipeline, PlugResult};
///
/// async fn hello(mut conn: Conn) -> PlugResult {
///     conn.send_resp(StatusCode::OK, "hello").await?;
///     Ok(conn)
/// }
///
/// let pipeline = Pipeline::builder().plug_fn("hello", hello).build().unwrap();
/// assert_eq!(pipeline.plug_names(), vec!["hello"]);
/// ```
#[derive(Clone)]
pub struct Pipeline {
    units: Arc<[Box<dyn Unit>]>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Creates a pipeline that returns connections unchanged.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            units: Arc::from(Vec::new()),
        }
    }

    /// Runs `conn` through every plug in order.
    ///
    /// Before each plug the connection's `halted` flag is checked; once it
    /// is set no further plug runs. The first error stops the pipeline and
    /// is returned as is.
    pub async fn run(&self, mut conn: Conn) -> PlugResult {
        for unit in self.units.iter() {
            if conn.halted() {
                break;
            }

            let id = conn.id();
            trace!(plug = unit.name(), conn_id = %id, "calling plug");
            conn = unit.call(conn).await?;

            if conn.id() != id {
                warn!(
                    plug = unit.name(),
                    expected = %id,
                    returned = %conn.id(),
                    "plug returned a different connection"
                );
                return Err(PlugError::ContractViolation {
                    plug: unit.name().to_string(),
                    reason: format!("returned connection {} in place of {id}", conn.id()),
                });
            }

            if conn.halted() {
                debug!(plug = unit.name(), conn_id = %id, "pipeline halted");
            }
        }
        Ok(conn)
    }

    /// Returns the names of all plugs in order.
    #[must_use]
    pub fn plug_names(&self) -> Vec<&'static str> {
        self.units.iter().map(|u| u.name()).collect()
    }

    /// Returns the number of plugs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the pipeline has no plugs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("plugs", &self.plug_names())
            .finish()
    }
}

impl Plug for Pipeline {
    type Raw = ();
    type Options = ();

    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn init(&self, (): ()) -> Result<(), PlugError> {
        Ok(())
    }

    fn call<'a>(&'a self, conn: Conn, _opts: &'a ()) -> BoxFuture<'a, PlugResult> {
        Box::pin(self.run(conn))
    }
}

/// Builder for constructing a [`Pipeline`].
///
/// Each plug is initialized as soon as it is added. The first `init`
/// failure is kept and returned by [`PipelineBuilder::build`]; plugs added
/// after it are not initialized.
#[must_use]
pub struct PipelineBuilder {
    units: Vec<Box<dyn Unit>>,
    error: Option<PlugError>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            error: None,
        }
    }

    /// Adds `plug`, initializing it with `raw`.
    pub fn plug<P: Plug>(mut self, plug: P, raw: P::Raw) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = plug.name();
        match Initialized::new(plug, raw) {
            Ok(unit) => self.units.push(Box::new(unit)),
            Err(err) => {
                warn!(plug = name, error = %err, "plug init failed");
                self.error = Some(err);
            }
        }
        self
    }

    /// Adds an async function taking only the connection.
    pub fn plug_fn<F, Fut>(self, name: &'static str, func: F) -> Self
    where
        F: Fn(Conn) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PlugResult> + Send + 'static,
    {
        self.plug(FnPlug::new(name, move |conn: Conn, (): ()| func(conn)), ())
    }

    /// Adds a nested pipeline.
    pub fn pipeline(self, pipeline: Pipeline) -> Self {
        self.plug(pipeline, ())
    }

    /// Adds a plug that forwards connections whose `path_info` starts with
    /// `path` to `target`.
    pub fn forward(self, path: impl Into<String>, target: Pipeline) -> Self {
        self.plug(
            Forward,
            ForwardTo {
                path: path.into(),
                target,
            },
        )
    }

    /// Builds the pipeline, or returns the first `init` error.
    pub fn build(self) -> Result<Pipeline, PlugError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Pipeline {
            units: Arc::from(self.units),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
