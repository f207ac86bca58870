//! Test doubles shared by the delivery unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::io;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use uuid::Uuid;

use super::error::{DeliveryError, DeliveryErrorKind};
use super::record::{AuditBackend, MemoryAuditBackend, TransferRecord};
use super::report::ErrorReporter;
use super::sink::{ResponseHead, ResponseSink};

/// Captures every reported failure.
#[derive(Default)]
pub(crate) struct RecordingReporter {
    pub reports: Mutex<Vec<(DeliveryErrorKind, IpAddr)>>,
}

impl RecordingReporter {
    pub fn count(&self) -> usize {
        self.reports.lock().len()
    }
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    async fn report(&self, error: &DeliveryError, ip: IpAddr) {
        self.reports.lock().push((error.kind(), ip));
    }
}

/// Backend that rejects every write.
pub(crate) struct FailingBackend;

#[async_trait]
impl AuditBackend for FailingBackend {
    async fn create_record(&self, _record: &TransferRecord) -> anyhow::Result<()> {
        anyhow::bail!("audit store offline")
    }

    async fn update_record(&self, _record: &TransferRecord) -> anyhow::Result<()> {
        anyhow::bail!("audit store offline")
    }

    async fn get_record(&self, _id: Uuid) -> anyhow::Result<Option<TransferRecord>> {
        Ok(None)
    }

    async fn list_records(&self, _limit: usize) -> anyhow::Result<Vec<TransferRecord>> {
        Ok(Vec::new())
    }
}

/// Memory backend whose first `create_record` call fails.
#[derive(Default)]
pub(crate) struct FlakyBackend {
    inner: MemoryAuditBackend,
    tripped: AtomicBool,
}

#[async_trait]
impl AuditBackend for FlakyBackend {
    async fn create_record(&self, record: &TransferRecord) -> anyhow::Result<()> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            anyhow::bail!("audit store briefly offline");
        }
        self.inner.create_record(record).await
    }

    async fn update_record(&self, record: &TransferRecord) -> anyhow::Result<()> {
        self.inner.update_record(record).await
    }

    async fn get_record(&self, id: Uuid) -> anyhow::Result<Option<TransferRecord>> {
        self.inner.get_record(id).await
    }

    async fn list_records(&self, limit: usize) -> anyhow::Result<Vec<TransferRecord>> {
        self.inner.list_records(limit).await
    }
}

/// In-memory sink that can be told to break after a number of bytes.
#[derive(Default)]
pub(crate) struct MemorySink {
    pub head: Option<ResponseHead>,
    pub body: Vec<u8>,
    pub finished: bool,
    /// Fail the first chunk that would push the body past this many bytes.
    pub fail_after: Option<usize>,
}

impl MemorySink {
    pub fn failing_after(bytes: usize) -> Self {
        Self {
            fail_after: Some(bytes),
            ..Self::default()
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head
            .as_ref()?
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}

#[async_trait]
impl ResponseSink for MemorySink {
    async fn send_head(&mut self, head: ResponseHead) -> io::Result<()> {
        self.head = Some(head);
        Ok(())
    }

    async fn send_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        if let Some(limit) = self.fail_after
            && self.body.len() + chunk.len() > limit
        {
            // Accept what fits, then report the client as gone.
            let room = limit - self.body.len();
            self.body.extend_from_slice(&chunk[..room]);
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client closed connection"));
        }
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Reader wrapper that counts how often it is dropped.
pub(crate) struct CountingReader<R> {
    inner: R,
    drops: Arc<AtomicUsize>,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> (Self, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                drops: Arc::clone(&drops),
            },
            drops,
        )
    }
}

impl<R> Drop for CountingReader<R> {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CountingReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<R: AsyncSeek + Unpin> AsyncSeek for CountingReader<R> {
    fn start_seek(mut self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.inner).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.inner).poll_complete(cx)
    }
}
