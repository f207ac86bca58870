//! Bridges the pump's [`ResponseSink`] to an axum streaming body.
//!
//! The pump runs on its own task and writes into a bounded channel. The
//! handler waits for the head, then returns a [`Body`] that drains the
//! channel. A full channel suspends the pump until hyper polls the body
//! again, so a slow client slows the disk reads.

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use std::io;
use tokio::sync::{mpsc, oneshot};

use crate::delivery::{ResponseHead, ResponseSink};

type BodyItem = io::Result<Bytes>;

/// Pump-side end of the bridge.
pub struct ChannelSink {
    head_tx: Option<oneshot::Sender<ResponseHead>>,
    body_tx: mpsc::Sender<BodyItem>,
    drained_rx: Option<oneshot::Receiver<()>>,
    abort_tx: Option<oneshot::Sender<String>>,
}

/// Handler-side end of the bridge.
pub struct PendingResponse {
    head_rx: oneshot::Receiver<ResponseHead>,
    body_rx: mpsc::Receiver<BodyItem>,
    drained_tx: oneshot::Sender<()>,
    abort_rx: oneshot::Receiver<String>,
}

/// Create a connected sink and pending response buffering `capacity` chunks.
pub fn channel_sink(capacity: usize) -> (ChannelSink, PendingResponse) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(capacity.max(1));
    let (drained_tx, drained_rx) = oneshot::channel();
    let (abort_tx, abort_rx) = oneshot::channel();
    (
        ChannelSink {
            head_tx: Some(head_tx),
            body_tx,
            drained_rx: Some(drained_rx),
            abort_tx: Some(abort_tx),
        },
        PendingResponse {
            head_rx,
            body_rx,
            drained_tx,
            abort_rx,
        },
    )
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

impl ChannelSink {
    /// Terminate the body with an error so the connection is not reused.
    ///
    /// The signal bypasses the chunk channel, so it lands even when the
    /// channel is full. Buffered chunks behind it are discarded.
    pub fn abort(&mut self, message: String) {
        if let Some(tx) = self.abort_tx.take() {
            let _ = tx.send(message);
        }
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn send_head(&mut self, head: ResponseHead) -> io::Result<()> {
        let tx = self
            .head_tx
            .take()
            .ok_or_else(|| io::Error::other("response head already sent"))?;
        tx.send(head).map_err(|_| disconnected())
    }

    async fn send_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        self.body_tx.send(Ok(chunk)).await.map_err(|_| disconnected())
    }

    async fn finish(&mut self) -> io::Result<()> {
        match self.drained_rx.take() {
            Some(rx) => rx.await.map_err(|_| disconnected()),
            None => Ok(()),
        }
    }
}

struct BodyState {
    rx: mpsc::Receiver<BodyItem>,
    remaining: u64,
    drained: Option<oneshot::Sender<()>>,
    abort: Option<oneshot::Receiver<String>>,
    aborted: bool,
}

impl BodyState {
    async fn next_item(&mut self) -> Option<BodyItem> {
        if self.aborted {
            return None;
        }
        if let Some(abort) = self.abort.as_mut() {
            tokio::select! {
                biased;
                message = abort => {
                    self.abort = None;
                    // A dropped sender means the pump ended without aborting.
                    if let Ok(message) = message {
                        self.aborted = true;
                        self.rx.close();
                        return Some(Err(io::Error::other(message)));
                    }
                },
                item = self.rx.recv() => return item,
            }
        }
        self.rx.recv().await
    }

    fn mark_drained(&mut self) {
        if self.remaining == 0
            && let Some(tx) = self.drained.take()
        {
            let _ = tx.send(());
        }
    }
}

impl PendingResponse {
    /// Wait for the head and build the streaming response.
    ///
    /// Returns `None` if the pump gave up before sending a head.
    pub async fn into_response(self) -> Option<Response> {
        let head = self.head_rx.await.ok()?;

        let mut state = BodyState {
            rx: self.body_rx,
            remaining: head.content_length,
            drained: Some(self.drained_tx),
            abort: Some(self.abort_rx),
            aborted: false,
        };
        state.mark_drained();

        let stream = futures::stream::unfold(state, |mut state| async move {
            let item = state.next_item().await?;
            if let Ok(chunk) = &item {
                state.remaining = state.remaining.saturating_sub(chunk.len() as u64);
                state.mark_drained();
            }
            Some((item, state))
        });

        Some(head_response(head, Body::from_stream(stream)))
    }
}

/// Build a response from `head` around `body`.
pub fn head_response(head: ResponseHead, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use http_body_util::BodyExt;

    fn head(len: u64) -> ResponseHead {
        ResponseHead {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            content_length: len,
        }
    }

    #[tokio::test]
    async fn test_body_carries_chunks_and_finish_waits_for_drain() {
        let (mut sink, pending) = channel_sink(1);

        let producer = tokio::spawn(async move {
            sink.send_head(head(6)).await.unwrap();
            sink.send_chunk(Bytes::from_static(b"abc")).await.unwrap();
            sink.send_chunk(Bytes::from_static(b"def")).await.unwrap();
            sink.finish().await
        });

        let response = pending.into_response().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"abcdef");
        assert!(producer.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_dropped_body_fails_the_producer() {
        let (mut sink, pending) = channel_sink(1);
        sink.send_head(head(1024)).await.unwrap();

        let response = pending.into_response().await.unwrap();
        drop(response);

        assert!(sink.send_chunk(Bytes::from_static(b"x")).await.is_err());
        assert_eq!(
            sink.finish().await.unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_drained_immediately() {
        let (mut sink, pending) = channel_sink(1);
        sink.send_head(head(0)).await.unwrap();
        let _response = pending.into_response().await.unwrap();
        assert!(sink.finish().await.is_ok());
    }

    #[tokio::test]
    async fn test_no_head_yields_no_response() {
        let (sink, pending) = channel_sink(1);
        drop(sink);
        assert!(pending.into_response().await.is_none());
    }

    #[tokio::test]
    async fn test_abort_lands_when_channel_is_full() {
        let (mut sink, pending) = channel_sink(1);
        sink.send_head(head(1024)).await.unwrap();
        sink.send_chunk(Bytes::from_static(b"abc")).await.unwrap();
        sink.abort("read failed".to_string());

        let response = pending.into_response().await.unwrap();
        let err = response.into_body().collect().await.unwrap_err();
        assert!(err.to_string().contains("read failed"));
    }

    #[tokio::test]
    async fn test_dropped_sink_without_abort_ends_body() {
        let (mut sink, pending) = channel_sink(2);
        sink.send_head(head(3)).await.unwrap();
        sink.send_chunk(Bytes::from_static(b"abc")).await.unwrap();
        drop(sink);

        let response = pending.into_response().await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"abc");
    }

    #[tokio::test]
    async fn test_head_cannot_be_sent_twice() {
        let (mut sink, _pending) = channel_sink(1);
        sink.send_head(head(0)).await.unwrap();
        assert!(sink.send_head(head(0)).await.is_err());
    }
}
