//! Forwarding to nested pipelines.

use crate::error::{PlugError, PlugResult};
use crate::pipeline::Pipeline;
use crate::plug::Plug;
use plumb_core::{split_path, BoxFuture, Conn};
use tracing::trace;

/// Raw options of the [`Forward`] plug.
#[derive(Debug, Clone)]
pub struct ForwardTo {
    /// Literal path prefix, e.g. `/api/v1`.
    pub path: String,
    /// Pipeline that receives the connection.
    pub target: Pipeline,
}

/// Options prepared by [`Forward::init`].
#[derive(Debug, Clone)]
pub struct ForwardOptions {
    prefix: Vec<String>,
    target: Pipeline,
}

impl ForwardOptions {
    /// The prefix segments moved into `script_name`.
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }
}

/// Moves a literal prefix from `path_info` to `script_name`, runs the
/// target pipeline, and restores the path afterwards.
///
/// A connection whose `path_info` does not start with the prefix fails
/// with [`ConnError::PathMismatch`](plumb_core::ConnError::PathMismatch).
#[derive(Debug, Clone, Copy, Default)]
pub struct Forward;

impl Plug for Forward {
    type Raw = ForwardTo;
    type Options = ForwardOptions;

    fn name(&self) -> &'static str {
        "forward"
    }

    fn init(&self, raw: ForwardTo) -> Result<ForwardOptions, PlugError> {
        let prefix = split_path(&raw.path);
        if let Some(segment) = prefix
            .iter()
            .find(|s| s.starts_with(':') || s.starts_with('*'))
        {
            return Err(PlugError::init(
                self.name(),
                format!("forward path {:?} has dynamic segment {segment:?}", raw.path),
            ));
        }
        Ok(ForwardOptions {
            prefix,
            target: raw.target,
        })
    }

    fn call<'a>(&'a self, conn: Conn, opts: &'a ForwardOptions) -> BoxFuture<'a, PlugResult> {
        Box::pin(forward_to(conn, &opts.prefix, &opts.target))
    }
}

/// Runs `target` with `prefix` moved into `script_name`, then restores the
/// path, also when a [`PlugError`] hands the connection back.
pub async fn forward_to<S>(mut conn: Conn, prefix: &[S], target: &Pipeline) -> PlugResult
where
    S: AsRef<str> + Sync,
{
    let mark = conn.forward(prefix)?;
    trace!(
        conn_id = %conn.id(),
        script_name = ?conn.script_name(),
        path_info = ?conn.path_info(),
        "forwarding"
    );

    match target.run(conn).await {
        Ok(mut conn) => {
            conn.restore_path(mark);
            Ok(conn)
        }
        Err(err) => Err(err.map_conn(|conn| {
            conn.restore_path(mark);
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use plumb_core::ConnError;
    use plumb_test::TestConn;

    async fn record_path(mut conn: Conn) -> PlugResult {
        let seen = (conn.script_name().to_vec(), conn.path_info().to_vec());
        conn.assign("seen", seen);
        Ok(conn)
    }

    async fn deny(mut conn: Conn) -> PlugResult {
        conn.send_resp(StatusCode::FORBIDDEN, "").await?;
        conn.halt();
        Ok(conn)
    }

    async fn unrouted(conn: Conn) -> PlugResult {
        Err(PlugError::no_route(conn))
    }

    async fn mark_after(mut conn: Conn) -> PlugResult {
        conn.assign("after", true);
        Ok(conn)
    }

    fn seen(conn: &Conn) -> (Vec<String>, Vec<String>) {
        conn.get_assign::<(Vec<String>, Vec<String>)>("seen")
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_forward_rewrites_and_restores() {
        let target = Pipeline::builder()
            .plug_fn("record", record_path)
            .build()
            .unwrap();
        let pipeline = Pipeline::builder()
            .forward("/api/v1", target)
            .build()
            .unwrap();

        let conn = pipeline
            .run(TestConn::get("/api/v1/users/9").build())
            .await
            .unwrap();

        let (script_name, path_info) = seen(&conn);
        assert_eq!(script_name, ["api", "v1"]);
        assert_eq!(path_info, ["users", "9"]);
        assert!(conn.script_name().is_empty());
        assert_eq!(conn.path_info(), ["api", "v1", "users", "9"]);
    }

    #[tokio::test]
    async fn test_nested_forwards_keep_path_invariant() {
        let inner = Pipeline::builder()
            .plug_fn("record", record_path)
            .build()
            .unwrap();
        let middle = Pipeline::builder().forward("/v2", inner).build().unwrap();
        let outer = Pipeline::builder().forward("/api", middle).build().unwrap();

        let conn = outer
            .run(TestConn::get("/api/v2/things").build())
            .await
            .unwrap();

        let (script_name, path_info) = seen(&conn);
        assert_eq!(script_name, ["api", "v2"]);
        assert_eq!(path_info, ["things"]);
        assert_eq!(conn.full_path(), "/api/v2/things");
    }

    #[tokio::test]
    async fn test_halt_inside_forward_stops_outer_pipeline() {
        let target = Pipeline::builder().plug_fn("deny", deny).build().unwrap();
        let pipeline = Pipeline::builder()
            .forward("/admin", target)
            .plug_fn("after", mark_after)
            .build()
            .unwrap();

        let conn = pipeline.run(TestConn::get("/admin").build()).await.unwrap();
        assert!(conn.halted());
        assert_eq!(conn.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(conn.get_assign::<bool>("after"), None);
    }

    #[tokio::test]
    async fn test_mismatched_prefix_fails() {
        let pipeline = Pipeline::builder()
            .forward("/api", Pipeline::empty())
            .build()
            .unwrap();

        let err = pipeline.run(TestConn::get("/web").build()).await.unwrap_err();
        assert!(matches!(
            err,
            PlugError::Conn(ConnError::PathMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_route_conn_is_restored() {
        let target = Pipeline::builder()
            .plug_fn("unrouted", unrouted)
            .build()
            .unwrap();
        let pipeline = Pipeline::builder().forward("/api", target).build().unwrap();

        let err = pipeline
            .run(TestConn::get("/api/missing").build())
            .await
            .unwrap_err();
        let conn = err.into_conn().unwrap();
        assert!(conn.script_name().is_empty());
        assert_eq!(conn.path_info(), ["api", "missing"]);
    }

    #[test]
    fn test_dynamic_prefix_is_rejected() {
        let err = Pipeline::builder()
            .forward("/users/:id", Pipeline::empty())
            .build()
            .unwrap_err();
        assert!(matches!(err, PlugError::Init { .. }));
    }
}
