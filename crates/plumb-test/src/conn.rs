//! Test connection building.

use crate::adapter::{Disconnect, Recorder, TestAdapter, RECORDER_KEY};
use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use plumb_core::{Conn, ConnBuilder, ReadBodyOptions, DEFAULT_QUERY_DEPTH, DEFAULT_QUERY_LENGTH};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr};

/// Builder for in-memory connections.
///
/// The built [`Conn`] runs on a [`TestAdapter`]; read back what it sent with
/// [`sent_response`](crate::sent_response).
///
/// # Example
///
/// ```
/// use plumb_test::TestConn;
///
/// let conn = TestConn::get("/users/7")
///     .query(&[("expand", "teams")])
///     .header("Authorization", "Bearer token")
///     .build();
///
/// assert_eq!(conn.path_info(), ["users", "7"]);
/// assert_eq!(conn.query_string(), "expand=teams");
/// assert_eq!(conn.req_header("authorization"), Some("Bearer token"));
/// ```
#[must_use]
pub struct TestConn {
    method: Method,
    target: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    remote_ip: IpAddr,
    query_length: usize,
    query_depth: usize,
    body_options: ReadBodyOptions,
    disconnect: Disconnect,
    error: Option<TestError>,
}

impl TestConn {
    /// Creates a builder for `method` and `target` (path plus optional query).
    pub fn new(method: Method, target: impl AsRef<str>) -> Self {
        Self {
            method,
            target: target.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            query_length: DEFAULT_QUERY_LENGTH,
            query_depth: DEFAULT_QUERY_DEPTH,
            body_options: ReadBodyOptions::default(),
            disconnect: Disconnect::Never,
            error: None,
        }
    }

    /// Creates a GET connection.
    pub fn get(target: impl AsRef<str>) -> Self {
        Self::new(Method::GET, target)
    }

    /// Creates a POST connection.
    pub fn post(target: impl AsRef<str>) -> Self {
        Self::new(Method::POST, target)
    }

    /// Creates a PUT connection.
    pub fn put(target: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, target)
    }

    /// Creates a PATCH connection.
    pub fn patch(target: impl AsRef<str>) -> Self {
        Self::new(Method::PATCH, target)
    }

    /// Creates a DELETE connection.
    pub fn delete(target: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// Creates a HEAD connection.
    pub fn head(target: impl AsRef<str>) -> Self {
        Self::new(Method::HEAD, target)
    }

    /// Creates an OPTIONS connection.
    pub fn options(target: impl AsRef<str>) -> Self {
        Self::new(Method::OPTIONS, target)
    }

    /// Appends URL-encoded query pairs.
    pub fn query<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
        self.query.extend(
            pairs
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );
        self
    }

    /// Appends a request header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let parsed = HeaderName::try_from(name)
            .map_err(|e| e.to_string())
            .and_then(|n| {
                HeaderValue::try_from(value.as_ref())
                    .map(|v| (n, v))
                    .map_err(|e| e.to_string())
            });
        match parsed {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(reason) => {
                self.error
                    .get_or_insert(TestError::InvalidHeader(format!("{name}: {reason}")));
            }
        }
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets the `Content-Type` header to `application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(e) => {
                self.error.get_or_insert(TestError::Json(e));
            }
        }
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    /// Sets the peer address.
    pub fn remote_ip(mut self, ip: IpAddr) -> Self {
        self.remote_ip = ip;
        self
    }

    /// Sets the maximum query string length.
    pub fn query_length(mut self, limit: usize) -> Self {
        self.query_length = limit;
        self
    }

    /// Sets the maximum query key nesting depth.
    pub fn query_depth(mut self, depth: usize) -> Self {
        self.query_depth = depth;
        self
    }

    /// Sets the limits [`Conn::read_body`] uses when called with `None`.
    pub fn body_options(mut self, opts: ReadBodyOptions) -> Self {
        self.body_options = opts;
        self
    }

    /// Makes the simulated peer disconnect.
    pub fn disconnect(mut self, disconnect: Disconnect) -> Self {
        self.disconnect = disconnect;
        self
    }

    /// Builds the connection, reporting invalid input.
    pub fn try_build(self) -> Result<Conn, TestError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut target = self.target;
        if !self.query.is_empty() {
            let encoded: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&encoded.join("&"));
        }

        let uri: Uri = target
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        let adapter = TestAdapter::new(self.body, self.disconnect);
        let recorder: Recorder = adapter.recorder();

        let mut conn = ConnBuilder::new(self.method, uri)
            .headers(self.headers)
            .remote_ip(self.remote_ip)
            .query_length(self.query_length)
            .query_depth(self.query_depth)
            .body_options(self.body_options)
            .build(adapter);
        conn.put_private(RECORDER_KEY, recorder);
        Ok(conn)
    }

    /// Builds the connection.
    ///
    /// # Panics
    ///
    /// Panics on an invalid URI, header or JSON body. Use
    /// [`TestConn::try_build`] to handle those as errors.
    pub fn build(self) -> Conn {
        self.try_build().expect("valid test connection")
    }
}
