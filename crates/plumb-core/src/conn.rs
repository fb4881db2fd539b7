//! The connection context.
//!
//! A [`Conn`] describes one request/response exchange. Plugs receive it by
//! value, update it through `&mut self` operations and hand it back. Only the
//! operations that reach the transport (`send_resp`, `send`, `send_chunked`,
//! `chunk`, `read_body`) are async.

use crate::adapter::{Adapter, BodyChunk};
use crate::assigns::Assigns;
use crate::body::{BodyRead, ReadBodyOptions};
use crate::error::{ConnError, ConnResult};
use crate::id::ConnId;
use crate::params::PathParams;
use crate::query::{self, QueryParams, DEFAULT_QUERY_DEPTH};
use crate::state::{ConnState, ResponseBody};
use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, HOST};
use http::uri::Scheme;
use http::{HeaderMap, Method, StatusCode, Uri};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::trace;

/// Host used when neither the URI nor a `host` header names one.
pub const DEFAULT_HOST: &str = "www.example.com";

/// Default maximum query string length in bytes.
pub const DEFAULT_QUERY_LENGTH: usize = 1_000_000;

const DEFAULT_CACHE_CONTROL: &str = "max-age=0, private, must-revalidate";

/// A callback run just before the response is flushed.
pub type BeforeSend = Arc<dyn Fn(&mut Conn) + Send + Sync>;

/// Response fields saved before a transport write, put back if it fails.
struct Staged {
    status: Option<StatusCode>,
    resp_headers: HeaderMap,
    resp_body: ResponseBody,
    state: ConnState,
    before_send: Vec<BeforeSend>,
}

/// Snapshot returned by [`Conn::forward`], consumed by [`Conn::restore_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the path must be restored once the nested pipeline returns"]
pub struct PathMark {
    script_len: usize,
}

/// One request/response exchange.
///
/// # Example
///
/// ```
/// use plumb_core::{Conn, ConnState};
/// # use plumb_core::adapter::{Adapter, BodyChunk, BoxFuture, TransportError};
/// # use bytes::Bytes;
/// # use http::{HeaderMap, StatusCode};
/// # struct Null;
/// # impl Adapter for Null {
/// #     fn name(&self) -> &'static str { "null" }
/// #     fn send_resp<'a>(&'a mut self, _: StatusCode, _: &'a HeaderMap, _: Bytes)
/// #         -> BoxFuture<'a, Result<(), TransportError>> { Box::pin(async { Ok(()) }) }
/// #     fn send_chunked<'a>(&'a mut self, _: StatusCode, _: &'a HeaderMap)
/// #         -> BoxFuture<'a, Result<(), TransportError>> { Box::pin(async { Ok(()) }) }
/// #     fn chunk(&mut self, _: Bytes) -> BoxFuture<'_, Result<(), TransportError>> {
/// #         Box::pin(async { Ok(()) })
/// #     }
/// #     fn read_req_body(&mut self, _: usize) -> BoxFuture<'_, Result<BodyChunk, TransportError>> {
/// #         Box::pin(async { Ok(BodyChunk::Done(Bytes::new())) })
/// #     }
/// # }
///
/// let mut conn = Conn::builder(http::Method::GET, "/users/42?page=2".parse().unwrap()).build(Null);
///
/// assert_eq!(conn.path_info(), ["users", "42"]);
/// assert_eq!(conn.query_string(), "page=2");
///
/// conn.resp(StatusCode::OK, "hello").unwrap();
/// assert_eq!(conn.state(), ConnState::Set);
/// ```
pub struct Conn {
    id: ConnId,
    method: Method,
    scheme: Scheme,
    host: String,
    port: u16,
    remote_ip: IpAddr,
    request_path: String,
    query_string: String,
    script_name: Vec<String>,
    path_info: Vec<String>,
    req_headers: HeaderMap,
    query_params: Option<Arc<QueryParams>>,
    query_length: usize,
    query_depth: usize,
    body_options: ReadBodyOptions,
    path_params: PathParams,
    status: Option<StatusCode>,
    resp_headers: HeaderMap,
    resp_body: ResponseBody,
    state: ConnState,
    assigns: Assigns,
    private: Assigns,
    halted: bool,
    before_send: Vec<BeforeSend>,
    adapter: Box<dyn Adapter>,
    released: bool,
}

impl Conn {
    /// Starts building a connection for `method` and `uri`.
    #[must_use]
    pub fn builder(method: Method, uri: Uri) -> ConnBuilder {
        ConnBuilder::new(method, uri)
    }

    // ---- request fields ----

    /// Unique id of this connection.
    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request scheme.
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Requested host, without port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Requested port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address of the peer.
    pub fn remote_ip(&self) -> IpAddr {
        self.remote_ip
    }

    /// The raw request path, as received.
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// The raw query string, without the leading `?`.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Path segments already consumed by forwards.
    pub fn script_name(&self) -> &[String] {
        &self.script_name
    }

    /// Path segments not yet consumed.
    pub fn path_info(&self) -> &[String] {
        &self.path_info
    }

    /// `script_name` and `path_info` joined back into one path.
    pub fn full_path(&self) -> String {
        let mut path = String::from("/");
        let segments: Vec<&str> = self
            .script_name
            .iter()
            .chain(&self.path_info)
            .map(String::as_str)
            .collect();
        path.push_str(&segments.join("/"));
        path
    }

    /// Request headers.
    pub fn req_headers(&self) -> &HeaderMap {
        &self.req_headers
    }

    /// First value of a request header, if it is valid UTF-8.
    pub fn req_header(&self, name: &str) -> Option<&str> {
        self.req_headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a request header, in the order received.
    pub fn req_header_values(&self, name: &str) -> Vec<&str> {
        self.req_headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Query parameters, if they were fetched already.
    pub fn query_params(&self) -> Option<&Arc<QueryParams>> {
        self.query_params.as_ref()
    }

    /// Parameters bound by routers.
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Body read limits used when `read_body` is given none.
    pub fn body_options(&self) -> ReadBodyOptions {
        self.body_options
    }

    // ---- response fields ----

    /// Response status, if one was set.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Response headers.
    pub fn resp_headers(&self) -> &HeaderMap {
        &self.resp_headers
    }

    /// First value of a response header, if it is valid UTF-8.
    pub fn resp_header(&self, name: &str) -> Option<&str> {
        self.resp_headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Response body.
    pub fn resp_body(&self) -> &ResponseBody {
        &self.resp_body
    }

    /// Response state.
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// True once a plug halted the pipeline.
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Application data.
    pub fn assigns(&self) -> &Assigns {
        &self.assigns
    }

    /// Mutable application data.
    pub fn assigns_mut(&mut self) -> &mut Assigns {
        &mut self.assigns
    }

    /// Library data.
    pub fn private(&self) -> &Assigns {
        &self.private
    }

    /// Mutable library data.
    pub fn private_mut(&mut self) -> &mut Assigns {
        &mut self.private
    }

    /// Name of the transport adapter.
    pub fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }

    // ---- pure transformations ----

    fn ensure_open(&self) -> ConnResult<()> {
        if self.state.is_terminal() {
            return Err(ConnError::AlreadySent { state: self.state });
        }
        Ok(())
    }

    /// Sets the response status.
    pub fn put_status(&mut self, status: StatusCode) -> ConnResult<&mut Self> {
        self.ensure_open()?;
        self.status = Some(status);
        Ok(self)
    }

    /// Sets a response header, replacing every existing value.
    ///
    /// The name is normalized to lowercase.
    pub fn put_resp_header(
        &mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> ConnResult<&mut Self> {
        self.ensure_open()?;
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.resp_headers.insert(name, value);
        Ok(self)
    }

    /// Adds response headers ahead of the existing ones, without replacing
    /// any. Nothing is added if one pair is invalid.
    pub fn prepend_resp_headers<I, K, V>(&mut self, headers: I) -> ConnResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.ensure_open()?;
        let mut merged = HeaderMap::new();
        for (name, value) in headers {
            let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
            merged.append(name, value);
        }
        for (name, value) in &self.resp_headers {
            merged.append(name.clone(), value.clone());
        }
        self.resp_headers = merged;
        Ok(self)
    }

    /// Removes every value of a response header.
    pub fn delete_resp_header(&mut self, name: impl AsRef<str>) -> ConnResult<&mut Self> {
        self.ensure_open()?;
        if let Ok(name) = HeaderName::from_bytes(name.as_ref().as_bytes()) {
            self.resp_headers.remove(name);
        }
        Ok(self)
    }

    /// Sets `content-type` to `content_type; charset=utf-8`.
    pub fn put_resp_content_type(&mut self, content_type: &str) -> ConnResult<&mut Self> {
        self.put_resp_content_type_with_charset(content_type, Some("utf-8"))
    }

    /// Sets `content-type`, appending a charset unless `charset` is `None`.
    pub fn put_resp_content_type_with_charset(
        &mut self,
        content_type: &str,
        charset: Option<&str>,
    ) -> ConnResult<&mut Self> {
        let value = match charset {
            Some(charset) => format!("{content_type}; charset={charset}"),
            None => content_type.to_string(),
        };
        self.put_resp_header(CONTENT_TYPE, value)
    }

    /// Stages a full response without sending it.
    pub fn resp(&mut self, status: StatusCode, body: impl Into<Bytes>) -> ConnResult<&mut Self> {
        self.ensure_open()?;
        self.status = Some(status);
        self.resp_body = ResponseBody::Full(body.into());
        self.state = ConnState::Set;
        Ok(self)
    }

    /// Stops the active pipeline after the current plug.
    pub fn halt(&mut self) -> &mut Self {
        self.halted = true;
        self
    }

    /// Stores application data under `key`.
    pub fn assign<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) -> &mut Self {
        self.assigns.insert(key, value);
        self
    }

    /// Returns application data stored under `key`.
    pub fn get_assign<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.assigns.get(key)
    }

    /// Stores library data under `key`.
    pub fn put_private<T: Send + Sync + 'static>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> &mut Self {
        self.private.insert(key, value);
        self
    }

    /// Returns library data stored under `key`.
    pub fn get_private<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.private.get(key)
    }

    /// Decodes the query string once and caches the result.
    ///
    /// Later calls return the same shared mapping.
    pub fn fetch_query_params(&mut self) -> ConnResult<Arc<QueryParams>> {
        if let Some(params) = &self.query_params {
            return Ok(Arc::clone(params));
        }
        let params = Arc::new(query::decode_with_depth(
            &self.query_string,
            self.query_length,
            self.query_depth,
        )?);
        self.query_params = Some(Arc::clone(&params));
        Ok(params)
    }

    /// Binds path parameters; incoming bindings replace existing ones.
    pub fn merge_path_params(&mut self, params: PathParams) -> &mut Self {
        self.path_params.merge(params);
        self
    }

    /// Moves `prefix` from the front of `path_info` to the end of
    /// `script_name`.
    pub fn forward<S: AsRef<str>>(&mut self, prefix: &[S]) -> ConnResult<PathMark> {
        let matches = prefix.len() <= self.path_info.len()
            && prefix
                .iter()
                .zip(&self.path_info)
                .all(|(p, s)| p.as_ref() == s);
        if !matches {
            return Err(ConnError::PathMismatch {
                prefix: prefix.iter().map(|p| p.as_ref().to_string()).collect(),
                path_info: self.path_info.clone(),
            });
        }

        let mark = PathMark {
            script_len: self.script_name.len(),
        };
        self.script_name.extend(self.path_info.drain(..prefix.len()));
        Ok(mark)
    }

    /// Undoes every forward made since `mark` was taken.
    pub fn restore_path(&mut self, mark: PathMark) -> &mut Self {
        if mark.script_len < self.script_name.len() {
            let mut moved = self.script_name.split_off(mark.script_len);
            moved.append(&mut self.path_info);
            self.path_info = moved;
        }
        self
    }

    /// Registers a callback run right before the response is flushed.
    ///
    /// Callbacks run in reverse registration order. If the transport then
    /// fails, their changes are undone and they run again on the next send.
    pub fn register_before_send<F>(&mut self, callback: F) -> ConnResult<&mut Self>
    where
        F: Fn(&mut Conn) + Send + Sync + 'static,
    {
        self.ensure_open()?;
        self.before_send.push(Arc::new(callback));
        Ok(self)
    }

    fn run_before_send(&mut self) {
        let callbacks = std::mem::take(&mut self.before_send);
        for callback in callbacks.iter().rev() {
            (callback.as_ref())(self);
        }
    }

    fn stage(&self) -> Staged {
        Staged {
            status: self.status,
            resp_headers: self.resp_headers.clone(),
            resp_body: self.resp_body.clone(),
            state: self.state,
            before_send: self.before_send.clone(),
        }
    }

    fn unstage(&mut self, staged: Staged) {
        self.status = staged.status;
        self.resp_headers = staged.resp_headers;
        self.resp_body = staged.resp_body;
        self.state = staged.state;
        self.before_send = staged.before_send;
    }

    // ---- transport operations ----

    /// Stages and sends a full response.
    ///
    /// If the transport fails, the previously staged response is kept.
    pub async fn send_resp(
        &mut self,
        status: StatusCode,
        body: impl Into<Bytes>,
    ) -> ConnResult<&mut Self> {
        let staged = self.stage();
        self.resp(status, body)?;
        let sent = self.send().await.map(|_| ());
        if let Err(err) = sent {
            self.unstage(staged);
            return Err(err);
        }
        Ok(self)
    }

    /// Sends the response staged with [`Conn::resp`].
    ///
    /// If the transport fails, the connection is left as it was before the
    /// call.
    pub async fn send(&mut self) -> ConnResult<&mut Self> {
        self.ensure_open()?;
        if self.state == ConnState::Unset {
            return Err(ConnError::NothingStaged);
        }

        let staged = self.stage();
        self.run_before_send();
        let status = self.status.unwrap_or(StatusCode::OK);
        let body = self.resp_body.as_bytes().cloned().unwrap_or_default();

        let sent = self
            .adapter
            .send_resp(status, &self.resp_headers, body)
            .await;
        if let Err(err) = sent {
            self.unstage(staged);
            return Err(err.into());
        }

        self.state = ConnState::Sent;
        trace!(conn_id = %self.id, status = status.as_u16(), "response sent");
        Ok(self)
    }

    /// Starts a chunked response.
    ///
    /// If the transport fails, the connection is left as it was before the
    /// call.
    pub async fn send_chunked(&mut self, status: StatusCode) -> ConnResult<&mut Self> {
        self.ensure_open()?;
        let staged = self.stage();
        self.status = Some(status);
        self.run_before_send();
        let status = self.status.unwrap_or(status);

        let sent = self.adapter.send_chunked(status, &self.resp_headers).await;
        if let Err(err) = sent {
            self.unstage(staged);
            return Err(err.into());
        }

        self.resp_body = ResponseBody::Chunked;
        self.state = ConnState::Chunked;
        trace!(conn_id = %self.id, status = status.as_u16(), "chunked response started");
        Ok(self)
    }

    /// Writes one chunk of a chunked response. Empty chunks are skipped.
    pub async fn chunk(&mut self, data: impl Into<Bytes>) -> ConnResult<&mut Self> {
        if self.state != ConnState::Chunked {
            return Err(ConnError::NotChunked { state: self.state });
        }
        let data = data.into();
        if !data.is_empty() {
            self.adapter.chunk(data).await?;
        }
        Ok(self)
    }

    /// Reads the request body through the adapter.
    ///
    /// `opts` of `None` uses the limits the connection was built with.
    /// Returns [`BodyRead::Partial`] once at least `length` bytes were read
    /// and more remain. A failed read releases the body stream.
    pub async fn read_body(
        &mut self,
        opts: impl Into<Option<ReadBodyOptions>>,
    ) -> ConnResult<BodyRead> {
        let opts = opts.into().unwrap_or(self.body_options);
        let mut buf = BytesMut::new();
        loop {
            let read = match self.adapter.read_req_body(opts.read_length).await {
                Ok(read) => read,
                Err(err) => {
                    self.release();
                    return Err(err.into());
                }
            };
            match read {
                BodyChunk::Done(bytes) => {
                    buf.extend_from_slice(&bytes);
                    return Ok(BodyRead::Complete(buf.freeze()));
                }
                BodyChunk::More(bytes) => {
                    buf.extend_from_slice(&bytes);
                    if buf.len() >= opts.length {
                        return Ok(BodyRead::Partial(buf.freeze()));
                    }
                }
            }
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.adapter.release();
        }
    }
}

impl Drop for Conn {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Conn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("request_path", &self.request_path)
            .field("script_name", &self.script_name)
            .field("path_info", &self.path_info)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("halted", &self.halted)
            .field("adapter", &self.adapter.name())
            .finish_non_exhaustive()
    }
}

fn parse_header(name: &str, value: &str) -> ConnResult<(HeaderName, HeaderValue)> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConnError::invalid_header(name, e))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|e| ConnError::invalid_header(name, e))?;
    Ok((header_name, header_value))
}

/// Splits a path into segments, dropping empty ones.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds a [`Conn`] from raw request data.
#[derive(Debug)]
pub struct ConnBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    host: Option<String>,
    remote_ip: IpAddr,
    query_length: usize,
    query_depth: usize,
    body_options: ReadBodyOptions,
}

impl ConnBuilder {
    /// Starts a builder for `method` and `uri`.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            host: None,
            remote_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            query_length: DEFAULT_QUERY_LENGTH,
            query_depth: DEFAULT_QUERY_DEPTH,
            body_options: ReadBodyOptions::default(),
        }
    }

    /// Starts a builder from the head of an `http` request.
    #[must_use]
    pub fn from_parts(parts: http::request::Parts) -> Self {
        let mut builder = Self::new(parts.method, parts.uri);
        builder.headers = parts.headers;
        builder
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces all request headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Overrides the host taken from the URI or `host` header.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn remote_ip(mut self, ip: IpAddr) -> Self {
        self.remote_ip = ip;
        self
    }

    /// Sets the maximum query string length accepted by `fetch_query_params`.
    #[must_use]
    pub fn query_length(mut self, limit: usize) -> Self {
        self.query_length = limit;
        self
    }

    /// Sets the maximum `[key]` nesting accepted by `fetch_query_params`.
    #[must_use]
    pub fn query_depth(mut self, depth: usize) -> Self {
        self.query_depth = depth;
        self
    }

    /// Sets the limits `read_body` uses when called without options.
    #[must_use]
    pub fn body_options(mut self, opts: ReadBodyOptions) -> Self {
        self.body_options = opts;
        self
    }

    /// Builds the connection on top of `adapter`.
    pub fn build(self, adapter: impl Adapter) -> Conn {
        let scheme = self.uri.scheme().cloned().unwrap_or(Scheme::HTTP);
        let default_port = if scheme == Scheme::HTTPS { 443 } else { 80 };

        let header_host = self
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(|h| match h.rsplit_once(':') {
                Some((host, port)) if port.parse::<u16>().is_ok() => {
                    (host.to_string(), port.parse::<u16>().ok())
                }
                _ => (h.to_string(), None),
            });

        let (host, port) = match (self.host, self.uri.host(), header_host) {
            (Some(host), _, _) => (host, self.uri.port_u16()),
            (None, Some(host), _) => (host.to_string(), self.uri.port_u16()),
            (None, None, Some((host, port))) => (host, port),
            (None, None, None) => (DEFAULT_HOST.to_string(), None),
        };

        let request_path = self.uri.path().to_string();
        let path_info = split_path(&request_path);

        let mut resp_headers = HeaderMap::new();
        resp_headers.insert(CACHE_CONTROL, HeaderValue::from_static(DEFAULT_CACHE_CONTROL));

        Conn {
            id: ConnId::new(),
            method: self.method,
            scheme,
            host,
            port: port.unwrap_or(default_port),
            remote_ip: self.remote_ip,
            query_string: self.uri.query().unwrap_or_default().to_string(),
            request_path,
            script_name: Vec::new(),
            path_info,
            req_headers: self.headers,
            query_params: None,
            query_length: self.query_length,
            query_depth: self.query_depth,
            body_options: self.body_options,
            path_params: PathParams::new(),
            status: None,
            resp_headers,
            resp_body: ResponseBody::Empty,
            state: ConnState::Unset,
            assigns: Assigns::new(),
            private: Assigns::new(),
            halted: false,
            before_send: Vec::new(),
            adapter: Box::new(adapter),
            released: false,
        }
    }
}
