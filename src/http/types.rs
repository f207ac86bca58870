//! Request and response payloads.

use serde::{Deserialize, Serialize};

/// Query of `/download` and `/download/patch`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub download_path: Option<String>,
    /// Free-form label stored on the transfer record.
    pub download_type: Option<String>,
}

/// Query of `/download/music`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicQuery {
    pub play_music_path: Option<String>,
}

/// Query of `/download/video`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoQuery {
    pub play_video_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
