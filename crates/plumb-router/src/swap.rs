//! Hot-swappable routers.

use crate::router::Router;
use arc_swap::ArcSwap;
use plumb_core::{BoxFuture, Conn};
use plumb_pipeline::{Plug, PlugError, PlugResult};
use std::sync::Arc;
use tracing::info;

/// A router that can be replaced while requests are in flight.
///
/// Readers never lock: each request loads the current router once and
/// keeps it for its whole run, so a swap only affects later requests.
///
/// # Example
///
/// ```
/// use http::Method;
/// use plumb_pipeline::Pipeline;
/// use plumb_router::{Router, SwappableRouter};
///
/// let v1 = Router::builder().get("/v1", Pipeline::empty()).build().unwrap();
/// let v2 = Router::builder().get("/v2", Pipeline::empty()).build().unwrap();
///
/// let router = SwappableRouter::new(v1);
/// let handle = router.clone();
/// handle.swap(v2);
///
/// assert!(router.load().match_route(&Method::GET, "/v2").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SwappableRouter {
    current: Arc<ArcSwap<Router>>,
}

impl SwappableRouter {
    /// Wraps `router`.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(router)),
        }
    }

    /// Returns the router currently installed.
    #[must_use]
    pub fn load(&self) -> Arc<Router> {
        self.current.load_full()
    }

    /// Installs `router` for subsequent requests and returns the old one.
    pub fn swap(&self, router: Router) -> Arc<Router> {
        let routes = router.len();
        let old = self.current.swap(Arc::new(router));
        info!(routes, "router swapped");
        old
    }
}

impl Plug for SwappableRouter {
    type Raw = ();
    type Options = ();

    fn name(&self) -> &'static str {
        "router"
    }

    fn init(&self, (): ()) -> Result<(), PlugError> {
        Ok(())
    }

    fn call<'a>(&'a self, conn: Conn, _opts: &'a ()) -> BoxFuture<'a, PlugResult> {
        let router = self.load();
        Box::pin(async move { router.route(conn).await })
    }
}
