//! Transfer record data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// Lifecycle state of a transfer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Success,
    Failed,
}

impl TransferStatus {
    /// Whether the record has reached its single terminal state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Which endpoint produced a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Download,
    Patch,
    Music,
    Video,
}

impl TransferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Patch => "patch",
            Self::Music => "music",
            Self::Video => "video",
        }
    }

    /// Label stored when the caller did not supply a `downloadType`.
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Download => "Normal Download",
            Self::Patch => "Patch Download",
            Self::Music => "Music Playback",
            Self::Video => "Video Playback",
        }
    }
}

/// Caller-side facts about a transfer, known before it starts.
#[derive(Debug, Clone)]
pub struct TransferMeta {
    pub user_id: String,
    pub ip: IpAddr,
    /// Raw path as requested by the caller.
    pub path: String,
    pub kind: TransferKind,
    pub label: Option<String>,
    pub file_size: u64,
}

/// Audit row for one full-file transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: Uuid,
    pub user_id: String,
    pub ip: IpAddr,
    pub path: String,
    pub kind: TransferKind,
    pub label: String,
    pub file_size: u64,
    pub status: TransferStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TransferRecord {
    /// Build a fresh `pending` record starting now.
    pub fn pending(meta: TransferMeta) -> Self {
        let label = meta
            .label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| meta.kind.default_label().to_string());
        Self {
            id: Uuid::new_v4(),
            user_id: meta.user_id,
            ip: meta.ip,
            path: meta.path,
            kind: meta.kind,
            label,
            file_size: meta.file_size,
            status: TransferStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
        }
    }

    /// Move a pending record to `status`, stamping end time and duration.
    ///
    /// Returns `false` without touching the record if it is already terminal.
    pub(crate) fn finish(&mut self, status: TransferStatus, now: DateTime<Utc>) -> bool {
        debug_assert!(status.is_terminal());
        if self.status.is_terminal() {
            return false;
        }
        // Wall clocks can step backwards; duration never goes negative.
        let end = now.max(self.start_time);
        let elapsed = (end - self.start_time).num_milliseconds().max(0);
        self.status = status;
        self.end_time = Some(end);
        self.duration_ms = Some(u64::try_from(elapsed).unwrap_or(0));
        true
    }
}
