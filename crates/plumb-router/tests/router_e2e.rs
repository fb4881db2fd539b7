//! Router integration tests.
//!
//! Every handler here is a `Reply` plug that records which rule ran and the
//! path it saw, then sends a 200 with its tag as the body.

use http::{Method, StatusCode};
use plumb_core::{BoxFuture, Conn};
use plumb_pipeline::{Pipeline, Plug, PlugError, PlugResult};
use plumb_router::{RouteInfo, RouteKind, Router, SwappableRouter, ROUTE_KEY};
use plumb_test::{sent_response, TestConn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Seen {
    tag: &'static str,
    script_name: Vec<String>,
    path_info: Vec<String>,
}

struct Reply;

impl Plug for Reply {
    type Raw = &'static str;
    type Options = &'static str;

    fn name(&self) -> &'static str {
        "reply"
    }

    fn init(&self, tag: &'static str) -> Result<&'static str, PlugError> {
        Ok(tag)
    }

    fn call<'a>(&'a self, mut conn: Conn, tag: &'a &'static str) -> BoxFuture<'a, PlugResult> {
        Box::pin(async move {
            let seen = Seen {
                tag: *tag,
                script_name: conn.script_name().to_vec(),
                path_info: conn.path_info().to_vec(),
            };
            conn.assign("seen", seen);
            conn.send_resp(StatusCode::OK, *tag).await?;
            Ok(conn)
        })
    }
}

fn reply(tag: &'static str) -> Pipeline {
    Pipeline::builder().plug(Reply, tag).build().unwrap()
}

async fn not_found(mut conn: Conn) -> PlugResult {
    conn.send_resp(StatusCode::NOT_FOUND, "not found").await?;
    Ok(conn)
}

fn seen(conn: &Conn) -> Seen {
    conn.get_assign::<Seen>("seen").cloned().unwrap()
}

async fn run(router: &Router, conn: Conn) -> Conn {
    router.route(conn).await.unwrap()
}

#[tokio::test]
async fn test_earliest_declared_rule_wins() {
    let router = Router::builder()
        .get("/a", reply("h1"))
        .get("/:x", reply("h2"))
        .build()
        .unwrap();

    let conn = run(&router, TestConn::get("/a").build()).await;
    assert_eq!(seen(&conn).tag, "h1");

    let conn = run(&router, TestConn::get("/other").build()).await;
    assert_eq!(seen(&conn).tag, "h2");
    assert_eq!(conn.path_params().segment("x"), Some("other"));
}

#[tokio::test]
async fn test_glob_binds_rest_and_leaves_it_in_path_info() {
    let router = Router::builder()
        .get("/files/*rest", reply("files"))
        .build()
        .unwrap();

    let conn = run(&router, TestConn::get("/files/a/b/c").build()).await;

    let rest: Vec<String> = ["a", "b", "c"].map(String::from).to_vec();
    assert_eq!(conn.path_params().glob("rest"), Some(&rest[..]));

    let seen = seen(&conn);
    assert_eq!(seen.script_name, ["files"]);
    assert_eq!(seen.path_info, rest);

    assert!(conn.script_name().is_empty());
    assert_eq!(conn.path_info(), ["files", "a", "b", "c"]);
}

#[tokio::test]
async fn test_head_runs_get_rule() {
    let router = Router::builder()
        .get("/page", reply("page"))
        .build()
        .unwrap();

    let conn = run(&router, TestConn::head("/page").build()).await;
    assert_eq!(seen(&conn).tag, "page");

    let err = router
        .route(TestConn::post("/page").build())
        .await
        .unwrap_err();
    assert!(err.is_no_route());
}

#[tokio::test]
async fn test_match_any_accepts_every_method() {
    let router = Router::builder()
        .match_any("/ping", reply("ping"))
        .build()
        .unwrap();

    for method in [Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS] {
        let conn = run(&router, TestConn::new(method, "/ping").build()).await;
        assert_eq!(seen(&conn).tag, "ping");
    }
}

#[tokio::test]
async fn test_route_info_is_recorded() {
    let router = Router::builder()
        .post("/users/:id", reply("update"))
        .build()
        .unwrap();

    let conn = run(&router, TestConn::post("/users/5").build()).await;
    assert_eq!(
        conn.get_private::<RouteInfo>(ROUTE_KEY),
        Some(&RouteInfo {
            method: Some(Method::POST),
            pattern: "/users/:id".to_string(),
            kind: RouteKind::Match,
        })
    );
}

#[tokio::test]
async fn test_forward_to_nested_router() {
    let users = Router::builder()
        .get("/users/:id", reply("user"))
        .build()
        .unwrap();
    let api = Pipeline::builder().plug(users, ()).build().unwrap();

    let root = Router::builder()
        .forward("/api/:version", api)
        .build()
        .unwrap();

    let conn = run(&root, TestConn::get("/api/v1/users/7").build()).await;
    let seen = seen(&conn);
    assert_eq!(seen.tag, "user");
    assert_eq!(seen.script_name, ["api", "v1", "users", "7"]);
    assert!(seen.path_info.is_empty());

    assert_eq!(conn.path_params().segment("version"), Some("v1"));
    assert_eq!(conn.path_params().segment("id"), Some("7"));

    assert!(conn.script_name().is_empty());
    assert_eq!(conn.path_info(), ["api", "v1", "users", "7"]);
    assert_eq!(conn.full_path(), "/api/v1/users/7");
}

#[tokio::test]
async fn test_catch_all_sends_not_found() {
    let missing = Pipeline::builder()
        .plug_fn("not_found", not_found)
        .build()
        .unwrap();
    let router = Router::builder()
        .get("/hello", reply("hello"))
        .catch_all(missing)
        .build()
        .unwrap();

    let conn = run(&router, TestConn::get("/missing").build()).await;
    sent_response(&conn)
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND)
        .assert_body_eq("not found");
}

#[tokio::test]
async fn test_no_route_returns_conn_unchanged() {
    let router = Router::builder()
        .get("/hello", reply("hello"))
        .build()
        .unwrap();

    let err = router
        .route(TestConn::get("/nope/deeper").build())
        .await
        .unwrap_err();

    match &err {
        PlugError::NoRoute { method, path, .. } => {
            assert_eq!(*method, Method::GET);
            assert_eq!(path, "/nope/deeper");
        }
        other => panic!("expected NoRoute, got {other:?}"),
    }

    let conn = err.into_conn().unwrap();
    assert_eq!(conn.path_info(), ["nope", "deeper"]);
    assert!(conn.path_params().is_empty());
    assert!(conn.get_private::<RouteInfo>(ROUTE_KEY).is_none());
}

#[tokio::test]
async fn test_nested_no_route_restores_outer_path() {
    let inner = Router::builder()
        .get("/known", reply("known"))
        .build()
        .unwrap();
    let inner = Pipeline::builder().plug(inner, ()).build().unwrap();
    let root = Router::builder().forward("/admin", inner).build().unwrap();

    let err = root
        .route(TestConn::get("/admin/unknown").build())
        .await
        .unwrap_err();

    let conn = err.into_conn().unwrap();
    assert!(conn.script_name().is_empty());
    assert_eq!(conn.path_info(), ["admin", "unknown"]);
}

#[tokio::test]
async fn test_router_inside_pipeline_respects_halt() {
    async fn deny(mut conn: Conn) -> PlugResult {
        conn.send_resp(StatusCode::FORBIDDEN, "").await?;
        conn.halt();
        Ok(conn)
    }

    let router = Router::builder().get("/", reply("root")).build().unwrap();
    let app = Pipeline::builder()
        .plug_fn("deny", deny)
        .plug(router, ())
        .build()
        .unwrap();

    let conn = app.run(TestConn::get("/").build()).await.unwrap();
    assert!(conn.halted());
    assert!(conn.get_assign::<Seen>("seen").is_none());
    assert_eq!(conn.status(), Some(StatusCode::FORBIDDEN));
}

#[tokio::test]
async fn test_swappable_router_switches_for_later_requests() {
    let swappable = SwappableRouter::new(
        Router::builder().get("/", reply("v1")).build().unwrap(),
    );
    let app = Pipeline::builder()
        .plug(swappable.clone(), ())
        .build()
        .unwrap();

    let conn = app.run(TestConn::get("/").build()).await.unwrap();
    assert_eq!(seen(&conn).tag, "v1");

    swappable.swap(Router::builder().get("/", reply("v2")).build().unwrap());

    let conn = app.run(TestConn::get("/").build()).await.unwrap();
    assert_eq!(seen(&conn).tag, "v2");
}
