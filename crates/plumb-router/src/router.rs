//! The router plug.
//!
//! A [`Router`] is compiled once from an ordered list of rules by
//! [`RouterBuilder`] and is immutable afterwards. Lookups go through a
//! per-method segment trie; when several rules match a path, the one
//! declared first wins.

use crate::error::RouteError;
use crate::method_index::MethodIndex;
use crate::pattern::Pattern;
use http::Method;
use plumb_core::{BoxFuture, Conn, PathParams};
use plumb_pipeline::{forward_to, Pipeline, Plug, PlugError, PlugResult};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// `private` key under which the matched [`RouteInfo`] is stored.
pub const ROUTE_KEY: &str = "plumb.route";

/// How a rule was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// A rule for one method, or every method via `match_any`.
    Match,
    /// A `forward` rule: a path prefix handed to a nested pipeline.
    Forward,
}

/// A compiled rule as seen from outside the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Declared method; `None` matches every method.
    pub method: Option<Method>,
    /// The pattern as written.
    pub pattern: String,
    /// How the rule was declared.
    pub kind: RouteKind,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{method} {}", self.pattern),
            None => write!(f, "* {}", self.pattern),
        }
    }
}

/// The result of [`Router::match_route`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// Declaration index of the matched rule.
    pub index: usize,
    /// The matched rule.
    pub route: &'a RouteInfo,
    /// Captured path parameters.
    pub params: PathParams,
    /// Number of leading segments the pattern consumed outside a glob.
    pub consumed: usize,
}

struct Rule {
    info: RouteInfo,
    pattern: Pattern,
    target: Pipeline,
}

struct Inner {
    rules: Vec<Rule>,
    index: MethodIndex,
    catch_all: Option<Pipeline>,
}

/// A compiled, immutable router.
///
/// Cloning is cheap; clones share the compiled rules.
///
/// # Example
///
/// ```
/// use http::{Method, StatusCode};
/// use plumb_core::Conn;
/// use plumb_pipeline::{Pipeline, PlugResult};
/// use plumb_router::Router;
///
/// async fn show(mut conn: Conn) -> PlugResult {
///     conn.send_resp(StatusCode::OK, "user").await?;
///     Ok(conn)
/// }
///
/// let show = Pipeline::builder().plug_fn("show", show).build().unwrap();
/// let router = Router::builder()
///     .get("/users/:id", show)
///     .build()
///     .unwrap();
///
/// let matched = router.match_route(&Method::GET, "/users/42").unwrap();
/// assert_eq!(matched.params.segment("id"), Some("42"));
/// assert!(router.match_route(&Method::POST, "/users/42").is_none());
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

impl Router {
    /// Creates a new router builder.
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Resolves `method` and `path` without running any handler.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let segments = plumb_core::split_path(path);
        self.resolve(method, &segments)
    }

    fn resolve<S: AsRef<str>>(&self, method: &Method, path: &[S]) -> Option<RouteMatch<'_>> {
        let index = self.inner.index.find(method, path)?;
        let rule = &self.inner.rules[index];
        let (params, consumed) = rule.pattern.bind(path);
        Some(RouteMatch {
            index,
            route: &rule.info,
            params,
            consumed,
        })
    }

    /// Lists the compiled rules in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteInfo> {
        self.inner.rules.iter().map(|rule| &rule.info)
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.rules.len()
    }

    /// Returns true if the router has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.index.is_empty()
    }

    /// Returns true if a catch-all pipeline is installed.
    #[must_use]
    pub fn has_catch_all(&self) -> bool {
        self.inner.catch_all.is_some()
    }

    /// Dispatches `conn` to the earliest matching rule.
    ///
    /// The match is bound into `path_params` and stored under
    /// [`ROUTE_KEY`]; the consumed segments are moved into `script_name`
    /// while the rule's pipeline runs. Without a match the catch-all runs,
    /// or the connection comes back inside [`PlugError::NoRoute`].
    pub async fn route(&self, mut conn: Conn) -> PlugResult {
        let Some(found) = self.resolve(conn.method(), conn.path_info()) else {
            return self.unmatched(conn).await;
        };

        debug!(
            conn_id = %conn.id(),
            route = %found.route,
            consumed = found.consumed,
            "route matched"
        );

        let rule = &self.inner.rules[found.index];
        let prefix = conn.path_info()[..found.consumed].to_vec();
        conn.merge_path_params(found.params);
        conn.put_private(ROUTE_KEY, rule.info.clone());

        forward_to(conn, &prefix, &rule.target).await
    }

    async fn unmatched(&self, conn: Conn) -> PlugResult {
        match &self.inner.catch_all {
            Some(catch_all) => {
                debug!(
                    conn_id = %conn.id(),
                    method = %conn.method(),
                    path = %conn.full_path(),
                    "no route matched, running catch-all"
                );
                catch_all.run(conn).await
            }
            None => {
                debug!(
                    conn_id = %conn.id(),
                    method = %conn.method(),
                    path = %conn.full_path(),
                    "no route matched"
                );
                Err(PlugError::no_route(conn))
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<String> = self.routes().map(ToString::to_string).collect();
        f.debug_struct("Router")
            .field("routes", &routes)
            .field("catch_all", &self.has_catch_all())
            .finish()
    }
}

impl Plug for Router {
    type Raw = ();
    type Options = ();

    fn name(&self) -> &'static str {
        "router"
    }

    fn init(&self, (): ()) -> Result<(), PlugError> {
        Ok(())
    }

    fn call<'a>(&'a self, conn: Conn, _opts: &'a ()) -> BoxFuture<'a, PlugResult> {
        Box::pin(self.route(conn))
    }
}

/// Builder for a [`Router`].
///
/// Rules are matched in the order they are declared here. The first
/// invalid pattern is kept and returned by [`RouterBuilder::build`].
#[must_use]
pub struct RouterBuilder {
    rules: Vec<Rule>,
    catch_all: Option<Pipeline>,
    error: Option<RouteError>,
}

impl RouterBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            catch_all: None,
            error: None,
        }
    }

    /// Adds a rule for `method`.
    pub fn route(self, method: Method, pattern: &str, target: Pipeline) -> Self {
        self.push(Some(method), pattern, target, RouteKind::Match)
    }

    /// Adds a `GET` rule. `HEAD` requests also match it.
    pub fn get(self, pattern: &str, target: Pipeline) -> Self {
        self.route(Method::GET, pattern, target)
    }

    /// Adds a `POST` rule.
    pub fn post(self, pattern: &str, target: Pipeline) -> Self {
        self.route(Method::POST, pattern, target)
    }

    /// Adds a `PUT` rule.
    pub fn put(self, pattern: &str, target: Pipeline) -> Self {
        self.route(Method::PUT, pattern, target)
    }

    /// Adds a `PATCH` rule.
    pub fn patch(self, pattern: &str, target: Pipeline) -> Self {
        self.route(Method::PATCH, pattern, target)
    }

    /// Adds a `DELETE` rule.
    pub fn delete(self, pattern: &str, target: Pipeline) -> Self {
        self.route(Method::DELETE, pattern, target)
    }

    /// Adds a `HEAD` rule.
    pub fn head(self, pattern: &str, target: Pipeline) -> Self {
        self.route(Method::HEAD, pattern, target)
    }

    /// Adds an `OPTIONS` rule.
    pub fn options(self, pattern: &str, target: Pipeline) -> Self {
        self.route(Method::OPTIONS, pattern, target)
    }

    /// Adds a rule matching every method.
    pub fn match_any(self, pattern: &str, target: Pipeline) -> Self {
        self.push(None, pattern, target, RouteKind::Match)
    }

    /// Hands every request under `path` to `target`, for every method.
    ///
    /// `path` may contain captures but no glob; the rest of the path is
    /// left in `path_info` for the target.
    pub fn forward(self, path: &str, target: Pipeline) -> Self {
        self.push(None, path, target, RouteKind::Forward)
    }

    /// Sets the pipeline run when no rule matches.
    pub fn catch_all(mut self, target: Pipeline) -> Self {
        self.catch_all = Some(target);
        self
    }

    fn push(mut self, method: Option<Method>, source: &str, target: Pipeline, kind: RouteKind) -> Self {
        if self.error.is_some() {
            return self;
        }
        let compiled = match kind {
            RouteKind::Match => Pattern::parse(source),
            RouteKind::Forward => Pattern::parse_forward(source),
        };
        match compiled {
            Ok(pattern) => self.rules.push(Rule {
                info: RouteInfo {
                    method,
                    pattern: source.to_string(),
                    kind,
                },
                pattern,
                target,
            }),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Compiles the rules into a [`Router`].
    pub fn build(self) -> Result<Router, RouteError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut index = MethodIndex::new();
        for (i, rule) in self.rules.iter().enumerate() {
            index.insert(rule.info.method.as_ref(), rule.pattern.segments(), i);
        }
        debug!(routes = self.rules.len(), "router compiled");

        Ok(Router {
            inner: Arc::new(Inner {
                rules: self.rules,
                index,
                catch_all: self.catch_all,
            }),
        })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
