//! End-to-end dispatch tests: configuration, router, dispatcher and the
//! test adapter together.

use bytes::Bytes;
use http::{Method, StatusCode, Uri};
use plumb::prelude::*;
use plumb::core::{BodyRead, QueryError};
use plumb_test::{sent_response, Disconnect, Recorder, TestAdapter, TestConn};

async fn hello(mut conn: Conn) -> PlugResult {
    conn.put_resp_content_type("text/plain")?;
    conn.resp(StatusCode::OK, "hello")?;
    Ok(conn)
}

async fn goodbye(mut conn: Conn) -> PlugResult {
    conn.send_resp(StatusCode::OK, "goodbye").await?;
    Ok(conn)
}

async fn teapot(mut conn: Conn) -> PlugResult {
    conn.send_resp(StatusCode::IM_A_TEAPOT, "").await?;
    Ok(conn)
}

async fn search(mut conn: Conn) -> PlugResult {
    let params = conn.fetch_query_params()?;
    let q = params.get_str("q").unwrap_or_default().to_string();
    conn.send_resp(StatusCode::OK, q).await?;
    Ok(conn)
}

async fn upload(mut conn: Conn) -> PlugResult {
    let reply = match conn.read_body(None).await? {
        BodyRead::Partial(bytes) => format!("partial:{}", String::from_utf8_lossy(&bytes)),
        BodyRead::Complete(bytes) => format!("complete:{}", String::from_utf8_lossy(&bytes)),
    };
    conn.send_resp(StatusCode::OK, reply).await?;
    Ok(conn)
}

fn single(name: &'static str, pipeline: Pipeline) -> Pipeline {
    let router = Router::builder().get(name, pipeline).build().unwrap();
    Pipeline::builder().plug(router, ()).build().unwrap()
}

fn app() -> Pipeline {
    let hello = Pipeline::builder().plug_fn("hello", hello).build().unwrap();
    single("/hello", hello)
}

#[tokio::test]
async fn test_matched_route_is_flushed() {
    let dispatcher = Dispatcher::new(app());

    let conn = dispatcher
        .dispatch(TestConn::get("/hello").build())
        .await
        .unwrap();

    assert_eq!(conn.state(), ConnState::Sent);
    sent_response(&conn)
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "text/plain; charset=utf-8")
        .assert_body_eq("hello");
}

#[tokio::test]
async fn test_unmatched_route_gets_404() {
    let dispatcher = Dispatcher::new(app());

    let conn = dispatcher
        .dispatch(TestConn::get("/missing").build())
        .await
        .unwrap();

    sent_response(&conn)
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_router_catch_all_takes_precedence_over_policy() {
    let teapot = Pipeline::builder().plug_fn("teapot", teapot).build().unwrap();
    let router = Router::builder().catch_all(teapot).build().unwrap();
    let root = Pipeline::builder().plug(router, ()).build().unwrap();

    let conn = Dispatcher::new(root)
        .dispatch(TestConn::delete("/anything").build())
        .await
        .unwrap();

    assert_eq!(
        sent_response(&conn).unwrap().status(),
        StatusCode::IM_A_TEAPOT
    );
}

#[tokio::test]
async fn test_error_policy_from_config() {
    let config = ConfigLoader::new()
        .with_string("[dispatcher]\nunmatched = \"error\"", "toml")
        .unwrap()
        .load()
        .unwrap();
    let dispatcher = Dispatcher::from_config(app(), &config);

    let err = dispatcher
        .dispatch(TestConn::get("/missing").build())
        .await
        .unwrap_err();

    match err {
        DispatchError::Plug(err) => {
            let conn = err.into_conn().unwrap();
            assert_eq!(conn.state(), ConnState::Unset);
            assert_eq!(conn.request_path(), "/missing");
        }
        other => panic!("expected a no-route error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reload_applies_to_later_requests() {
    let dispatcher = Dispatcher::new(app());
    let handle = dispatcher.clone();

    let goodbye = Pipeline::builder().plug_fn("goodbye", goodbye).build().unwrap();
    let old = handle.reload(single("/hello", goodbye));
    assert_eq!(old.plug_names(), vec!["router"]);

    let conn = dispatcher
        .dispatch(TestConn::get("/hello").build())
        .await
        .unwrap();
    sent_response(&conn).unwrap().assert_body_eq("goodbye");
}

#[tokio::test]
async fn test_configured_query_length_applies() {
    let config = ConfigLoader::new()
        .with_string("[query]\nlength = 8", "toml")
        .unwrap()
        .load()
        .unwrap();
    let search = Pipeline::builder().plug_fn("search", search).build().unwrap();
    let dispatcher = Dispatcher::from_config(single("/search", search), &config);

    let short = Uri::from_static("/search?q=rust");
    let adapter = TestAdapter::new(Bytes::new(), Disconnect::Never);
    let recorder: Recorder = adapter.recorder();
    let conn = dispatcher.conn_builder(Method::GET, short).build(adapter);

    dispatcher.dispatch(conn).await.unwrap();
    assert_eq!(recorder.snapshot().body, Bytes::from("rust"));

    let long = Uri::from_static("/search?q=a-much-longer-query");
    let conn = dispatcher
        .conn_builder(Method::GET, long)
        .build(TestAdapter::new(Bytes::new(), Disconnect::Never));

    let err = dispatcher.dispatch(conn).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Plug(PlugError::Conn(ConnError::InvalidQuery(QueryError::TooLong { .. })))
    ));
}

#[tokio::test]
async fn test_disconnect_on_flush_is_reported() {
    let dispatcher = Dispatcher::new(app());

    let err = dispatcher
        .dispatch(TestConn::get("/hello").disconnect(Disconnect::OnSend).build())
        .await
        .unwrap_err();

    assert!(err.is_closed());
}

#[tokio::test]
async fn test_configured_body_limits_apply() {
    let config = ConfigLoader::new()
        .with_string("[body]\nlength = 4\nread_length = 2", "toml")
        .unwrap()
        .load()
        .unwrap();
    let upload = Pipeline::builder().plug_fn("upload", upload).build().unwrap();
    let router = Router::builder().post("/upload", upload).build().unwrap();
    let root = Pipeline::builder().plug(router, ()).build().unwrap();
    let dispatcher = Dispatcher::from_config(root, &config);

    let adapter = TestAdapter::new(Bytes::from("hello world"), Disconnect::Never);
    let recorder = adapter.recorder();
    let conn = dispatcher
        .conn_builder(Method::POST, Uri::from_static("/upload"))
        .build(adapter);

    dispatcher.dispatch(conn).await.unwrap();
    assert_eq!(recorder.snapshot().body, Bytes::from("partial:hell"));
}

#[tokio::test]
async fn test_configured_query_depth_applies() {
    let config = ConfigLoader::new()
        .with_string("[query]\ndepth = 2", "toml")
        .unwrap()
        .load()
        .unwrap();
    let search = Pipeline::builder().plug_fn("search", search).build().unwrap();
    let dispatcher = Dispatcher::from_config(single("/search", search), &config);

    let shallow = Uri::from_static("/search?q=rust&f%5Ba%5D%5Bb%5D=1");
    let adapter = TestAdapter::new(Bytes::new(), Disconnect::Never);
    let recorder = adapter.recorder();
    dispatcher
        .dispatch(dispatcher.conn_builder(Method::GET, shallow).build(adapter))
        .await
        .unwrap();
    assert_eq!(recorder.snapshot().body, Bytes::from("rust"));

    let deep = Uri::from_static("/search?q=rust&f%5Ba%5D%5Bb%5D%5Bc%5D=1");
    let conn = dispatcher
        .conn_builder(Method::GET, deep)
        .build(TestAdapter::new(Bytes::new(), Disconnect::Never));

    let err = dispatcher.dispatch(conn).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Plug(PlugError::Conn(ConnError::InvalidQuery(QueryError::TooDeep { .. })))
    ));
}
