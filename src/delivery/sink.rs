//! The pump's view of a client connection.

use async_trait::async_trait;
use bytes::Bytes;
use hyper::StatusCode;
use hyper::header::HeaderMap;
use std::io;

/// Status line and headers of a streamed response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Number of body bytes that will follow.
    pub content_length: u64,
}

/// Destination of a streamed response.
///
/// `send_chunk` may suspend while the client is slow; callers must await it
/// before producing the next chunk. An `Err` from any method means the client
/// is gone and nothing more will be accepted.
#[async_trait]
pub trait ResponseSink: Send {
    /// Deliver the status and headers. Called exactly once, first.
    async fn send_head(&mut self, head: ResponseHead) -> io::Result<()>;

    /// Deliver one body chunk.
    async fn send_chunk(&mut self, chunk: Bytes) -> io::Result<()>;

    /// Wait until the client consumed the whole body.
    async fn finish(&mut self) -> io::Result<()>;
}
