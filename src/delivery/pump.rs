//! Chunked file-to-client copying for full and ranged responses.
//!
//! The pump owns the file handle for the duration of one call and drops it on
//! every exit path. It reads one chunk, waits for the sink to accept it, then
//! reads the next; a slow client therefore stalls disk reads instead of
//! growing a buffer.

use bytes::BytesMut;
use hyper::StatusCode;
use hyper::header::{
    ACCEPT_RANGES, ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_DISPOSITION, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, HeaderMap, HeaderValue,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::io::{self, SeekFrom};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::debug;

use super::error::DeliveryError;
use super::range::ByteRange;
use super::resolver::ResolvedPath;
use super::sink::{ResponseHead, ResponseSink};
use crate::constants::{CHUNK_SIZE, OCTET_STREAM};

/// Characters left unescaped in `Content-Disposition` filenames.
///
/// Matches what browsers' `encodeURIComponent` leaves alone, so clients can
/// decode the name with `decodeURIComponent`.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How a full response presents itself to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Played in place (media playback).
    Inline,
    /// Saved to disk under the file's basename.
    Attachment,
}

/// Result of one pump invocation.
#[derive(Debug)]
pub enum StreamOutcome {
    /// Every requested byte was accepted by the client.
    Success { bytes_sent: u64 },
    /// The transfer stopped early. Always a [`DeliveryError::StreamFailure`].
    Failure(DeliveryError),
}

impl StreamOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn bytes_sent(&self) -> u64 {
        match self {
            Self::Success { bytes_sent } => *bytes_sent,
            Self::Failure(DeliveryError::StreamFailure { bytes_sent, .. }) => *bytes_sent,
            Self::Failure(_) => 0,
        }
    }
}

/// Copies files, or windows of files, into a [`ResponseSink`].
#[derive(Debug, Clone, Copy)]
pub struct StreamPump {
    chunk_size: usize,
}

impl Default for StreamPump {
    fn default() -> Self {
        Self::new(CHUNK_SIZE)
    }
}

impl StreamPump {
    /// Create a pump reading `chunk_size` bytes at a time (minimum 1).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Open `path` and send it whole with a 200 head.
    pub async fn stream_full<S>(
        &self,
        path: &ResolvedPath,
        file_size: u64,
        disposition: Disposition,
        sink: &mut S,
    ) -> StreamOutcome
    where
        S: ResponseSink + ?Sized,
    {
        match File::open(path.path()).await {
            Ok(file) => self.copy_full(file, path, file_size, disposition, sink).await,
            Err(e) => StreamOutcome::Failure(DeliveryError::stream_failure(0, e)),
        }
    }

    /// Open `path` and send the `range` window with a 206 head.
    pub async fn stream_range<S>(
        &self,
        path: &ResolvedPath,
        range: ByteRange,
        sink: &mut S,
    ) -> StreamOutcome
    where
        S: ResponseSink + ?Sized,
    {
        match File::open(path.path()).await {
            Ok(file) => self.copy_range(file, path.mime(), range, sink).await,
            Err(e) => StreamOutcome::Failure(DeliveryError::stream_failure(0, e)),
        }
    }

    /// Send everything `reader` yields up to `file_size` bytes.
    pub async fn copy_full<R, S>(
        &self,
        reader: R,
        path: &ResolvedPath,
        file_size: u64,
        disposition: Disposition,
        sink: &mut S,
    ) -> StreamOutcome
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
        S: ResponseSink + ?Sized,
    {
        let head = full_head(path.mime(), path.file_name(), file_size, disposition);
        self.pump(reader, head, 0, file_size, sink).await
    }

    /// Send the `range` window of `reader`.
    pub async fn copy_range<R, S>(
        &self,
        reader: R,
        mime: &str,
        range: ByteRange,
        sink: &mut S,
    ) -> StreamOutcome
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
        S: ResponseSink + ?Sized,
    {
        let head = partial_head(mime, range);
        self.pump(reader, head, range.start, range.len(), sink).await
    }

    async fn pump<R, S>(
        &self,
        mut reader: R,
        head: ResponseHead,
        offset: u64,
        len: u64,
        sink: &mut S,
    ) -> StreamOutcome
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
        S: ResponseSink + ?Sized,
    {
        let mut sent = 0u64;
        let result = self
            .copy_window(&mut reader, head, offset, len, sink, &mut sent)
            .await;
        drop(reader);

        match result {
            Ok(()) => {
                debug!(bytes_sent = sent, "Stream finished");
                StreamOutcome::Success { bytes_sent: sent }
            },
            Err(e) => {
                debug!(bytes_sent = sent, expected = len, error = %e, "Stream aborted");
                StreamOutcome::Failure(DeliveryError::stream_failure(sent, e))
            },
        }
    }

    async fn copy_window<R, S>(
        &self,
        reader: &mut R,
        head: ResponseHead,
        offset: u64,
        len: u64,
        sink: &mut S,
        sent: &mut u64,
    ) -> io::Result<()>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
        S: ResponseSink + ?Sized,
    {
        if offset > 0 {
            reader.seek(SeekFrom::Start(offset)).await?;
        }
        sink.send_head(head).await?;

        while *sent < len {
            let want = usize::try_from(len - *sent).map_or(self.chunk_size, |rest| rest.min(self.chunk_size));
            let mut buf = BytesMut::zeroed(want);
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file ended after {sent} of {len} bytes"),
                ));
            }
            buf.truncate(n);
            sink.send_chunk(buf.freeze()).await?;
            *sent += n as u64;
        }

        sink.finish().await
    }
}

/// Head of a complete 200 response.
pub fn full_head(
    mime: &str,
    file_name: &str,
    file_size: u64,
    disposition: Disposition,
) -> ResponseHead {
    let mut headers = base_headers(mime, file_size);
    if disposition == Disposition::Attachment {
        headers.insert(CONTENT_DISPOSITION, attachment_disposition(file_name));
        headers.insert(
            ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("Content-Disposition"),
        );
    }
    ResponseHead {
        status: StatusCode::OK,
        headers,
        content_length: file_size,
    }
}

/// Head of a 206 response for `range`.
pub fn partial_head(mime: &str, range: ByteRange) -> ResponseHead {
    let mut headers = base_headers(mime, range.len());
    if let Ok(value) = HeaderValue::from_str(&range.content_range()) {
        headers.insert(CONTENT_RANGE, value);
    }
    ResponseHead {
        status: StatusCode::PARTIAL_CONTENT,
        headers,
        content_length: range.len(),
    }
}

/// `attachment; filename=<percent-encoded basename>`
pub fn attachment_disposition(file_name: &str) -> HeaderValue {
    let encoded = utf8_percent_encode(file_name, FILENAME_ENCODE_SET);
    HeaderValue::from_str(&format!("attachment; filename={encoded}"))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn base_headers(mime: &str, content_length: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(mime).unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM)),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers
}
