//! What a connection flushed to its adapter.

use crate::adapter::Recorder;
use crate::error::TestError;
use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap, HeaderValue, StatusCode};
use plumb_core::Conn;
use serde::de::DeserializeOwned;
use std::fmt;

/// A flushed response, with helper methods for assertions.
///
/// For chunked responses, [`SentResponse::body`] is the concatenation of
/// every chunk written.
pub struct SentResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    chunks: Option<Vec<Bytes>>,
}

/// Returns the response `conn` flushed through its test adapter.
///
/// # Example
///
/// ```
/// use plumb_test::{sent_response, TestConn};
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let mut conn = TestConn::get("/").build();
/// conn.send_resp(StatusCode::OK, "hi").await.unwrap();
///
/// let resp = sent_response(&conn).unwrap();
/// resp.assert_status(StatusCode::OK).assert_body_eq("hi");
/// # });
/// ```
pub fn sent_response(conn: &Conn) -> Result<SentResponse, TestError> {
    let recorder = Recorder::of(conn).ok_or(TestError::NoRecorder)?;
    let recording = recorder.snapshot();
    let status = recording.status.ok_or(TestError::NotSent)?;

    let (body, chunks) = if recording.chunked {
        let mut body = BytesMut::new();
        for chunk in &recording.chunks {
            body.extend_from_slice(chunk);
        }
        (body.freeze(), Some(recording.chunks))
    } else {
        (recording.body, None)
    };

    Ok(SentResponse {
        status,
        headers: recording.headers,
        body,
        chunks,
    })
}

impl SentResponse {
    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Returns a header value as a string.
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the chunks of a chunked response.
    pub fn chunks(&self) -> Option<&[Bytes]> {
        self.chunks.as_deref()
    }

    /// Returns true if the response was chunked.
    pub fn is_chunked(&self) -> bool {
        self.chunks.is_some()
    }

    /// Returns the body as a UTF-8 string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| TestError::BodyRead(e.to_string()))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}",
            expected, self.status
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{}' not found", name));
        assert_eq!(
            actual, expected,
            "Header '{}': expected '{}', got '{}'",
            name, expected, actual
        );
        self
    }

    /// Asserts that the body equals the expected string.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't match.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        let body = self.text().expect("Body should be valid UTF-8");
        assert_eq!(body, expected.as_ref(), "Body mismatch");
        self
    }

    /// Asserts that the JSON body matches the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the JSON doesn't match.
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        let actual: serde_json::Value = self.json().expect("Body should be valid JSON");
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }
}

impl fmt::Debug for SentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .field("chunked", &self.is_chunked())
            .finish()
    }
}
