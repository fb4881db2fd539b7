//! Recording transport adapter.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
use plumb_core::{Adapter, BodyChunk, BoxFuture, Conn, TransportError};
use std::collections::VecDeque;
use std::sync::Arc;

/// Key under which [`TestConn`](crate::TestConn) stores the recorder in
/// `conn.private`.
pub const RECORDER_KEY: &str = "plumb.test.recorder";

/// What the adapter saw.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    /// Status of the flushed response.
    pub status: Option<StatusCode>,
    /// Headers of the flushed response.
    pub headers: HeaderMap,
    /// Body passed to `send_resp`.
    pub body: Bytes,
    /// True if the response was started with `send_chunked`.
    pub chunked: bool,
    /// Chunks written, in order.
    pub chunks: Vec<Bytes>,
    /// Number of `send_resp`/`send_chunked` calls.
    pub sends: usize,
    /// Number of times the adapter released its body stream.
    pub releases: usize,
}

/// Shared handle on a [`Recording`].
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Recording>>);

impl Recorder {
    /// Returns the recorder of a connection built by `TestConn`.
    pub fn of(conn: &Conn) -> Option<Self> {
        conn.get_private::<Self>(RECORDER_KEY).cloned()
    }

    /// Returns a copy of everything recorded so far.
    pub fn snapshot(&self) -> Recording {
        self.0.lock().clone()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recording) -> R) -> R {
        f(&mut self.0.lock())
    }
}

/// When the simulated peer goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disconnect {
    /// Never.
    #[default]
    Never,
    /// After this many chunks were written.
    AfterChunks(usize),
    /// On the first request body read.
    OnRead,
    /// On `send_resp` or `send_chunked`.
    OnSend,
}

/// An in-memory adapter that records the response and serves a fixed
/// request body.
#[derive(Debug)]
pub struct TestAdapter {
    recorder: Recorder,
    body: VecDeque<Bytes>,
    disconnect: Disconnect,
}

impl TestAdapter {
    /// Creates an adapter serving `body`.
    pub fn new(body: Bytes, disconnect: Disconnect) -> Self {
        Self {
            recorder: Recorder::default(),
            body: if body.is_empty() {
                VecDeque::new()
            } else {
                VecDeque::from([body])
            },
            disconnect,
        }
    }

    /// Returns the recorder shared with this adapter.
    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }
}

impl Adapter for TestAdapter {
    fn name(&self) -> &'static str {
        "test"
    }

    fn send_resp<'a>(
        &'a mut self,
        status: StatusCode,
        headers: &'a HeaderMap,
        body: Bytes,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        let result = if self.disconnect == Disconnect::OnSend {
            Err(TransportError::Closed)
        } else {
            self.recorder.with(|rec| {
                rec.status = Some(status);
                rec.headers = headers.clone();
                rec.body = body;
                rec.sends += 1;
            });
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn send_chunked<'a>(
        &'a mut self,
        status: StatusCode,
        headers: &'a HeaderMap,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        let result = if self.disconnect == Disconnect::OnSend {
            Err(TransportError::Closed)
        } else {
            self.recorder.with(|rec| {
                rec.status = Some(status);
                rec.headers = headers.clone();
                rec.chunked = true;
                rec.sends += 1;
            });
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn chunk(&mut self, data: Bytes) -> BoxFuture<'_, Result<(), TransportError>> {
        let disconnect = self.disconnect;
        let result = self.recorder.with(|rec| match disconnect {
            Disconnect::AfterChunks(n) if rec.chunks.len() >= n => Err(TransportError::Closed),
            _ => {
                rec.chunks.push(data);
                Ok(())
            }
        });
        Box::pin(async move { result })
    }

    fn read_req_body(
        &mut self,
        read_length: usize,
    ) -> BoxFuture<'_, Result<BodyChunk, TransportError>> {
        let result = if self.disconnect == Disconnect::OnRead {
            Err(TransportError::Closed)
        } else {
            Ok(self.next_body_chunk(read_length.max(1)))
        };
        Box::pin(async move { result })
    }

    fn release(&mut self) {
        self.body.clear();
        self.recorder.with(|rec| rec.releases += 1);
    }
}

impl TestAdapter {
    fn next_body_chunk(&mut self, read_length: usize) -> BodyChunk {
        let Some(mut front) = self.body.pop_front() else {
            return BodyChunk::Done(Bytes::new());
        };
        if front.len() > read_length {
            let rest = front.split_off(read_length);
            self.body.push_front(rest);
            BodyChunk::More(front)
        } else if self.body.is_empty() {
            BodyChunk::Done(front)
        } else {
            BodyChunk::More(front)
        }
    }
}
