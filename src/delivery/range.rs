//! Single byte-range parsing for media seeking.
//!
//! Only the `bytes=<start>-<end>?` form is accepted. An open-ended range is
//! capped to [`RANGE_WINDOW_SIZE`] bytes so players probing ahead receive
//! bounded chunks.

use super::error::{DeliveryError, Result};
use crate::constants::RANGE_WINDOW_SIZE;

/// Inclusive byte window inside a file of `total` bytes.
///
/// Invariant: `start <= end < total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

#[allow(clippy::len_without_is_empty)] // A range always covers at least one byte
impl ByteRange {
    /// Number of bytes in the window.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Parse an optional `Range` header against a known file size.
///
/// Returns `Ok(None)` when no header was sent.
///
/// # Errors
///
/// Returns [`DeliveryError::InvalidRange`] when the header is malformed or
/// cannot be satisfied for `file_size`.
///
/// # Examples
///
/// ```
/// use depot::delivery::range;
///
/// let r = range::parse(Some("bytes=0-99"), 1000).unwrap().unwrap();
/// assert_eq!((r.start, r.end), (0, 99));
/// assert_eq!(r.content_range(), "bytes 0-99/1000");
///
/// assert!(range::parse(None, 1000).unwrap().is_none());
/// assert!(range::parse(Some("bytes=999999-"), 1000).is_err());
/// ```
pub fn parse(header: Option<&str>, file_size: u64) -> Result<Option<ByteRange>> {
    let Some(raw) = header else {
        return Ok(None);
    };
    let invalid = |reason| DeliveryError::invalid_range(raw, reason, file_size);

    let (unit, ranges) = raw.trim().split_once('=').ok_or_else(|| invalid("missing '='"))?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(invalid("unsupported range unit"));
    }
    if ranges.contains(',') {
        return Err(invalid("multiple ranges are not supported"));
    }

    let (start, end) = ranges.trim().split_once('-').ok_or_else(|| invalid("missing '-'"))?;
    let start = parse_offset(start).ok_or_else(|| invalid("start offset is required"))?;
    let end = match end.trim() {
        "" => start.saturating_add(RANGE_WINDOW_SIZE - 1),
        text => parse_offset(text).ok_or_else(|| invalid("malformed end offset"))?,
    };

    if start >= file_size {
        return Err(invalid("start beyond end of file"));
    }
    let end = end.min(file_size - 1);
    if start > end {
        return Err(invalid("start after end"));
    }

    Ok(Some(ByteRange {
        start,
        end,
        total: file_size,
    }))
}

fn parse_offset(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
