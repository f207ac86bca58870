//! Download endpoint handlers.
//!
//! Each handler authenticates, plans the delivery synchronously and then
//! hands the plan to a spawned task that streams it. Everything that can be
//! refused is refused before the task starts. HEAD requests get the planned
//! head and never start the task.

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::{CONTENT_TYPE, RANGE};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::debug;

use super::AppState;
use super::audit::{AuditEvent, log_audit_event};
use super::error::AppError;
use super::sink::{channel_sink, head_response};
use super::types::{DownloadQuery, HealthResponse, MusicQuery, VideoQuery};
use crate::constants::SINK_CAPACITY;
use crate::delivery::{Caller, DeliveryError, DeliveryPlan, StreamOutcome};

/// GET /download - attachment below the download folder.
pub(crate) async fn download(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let caller = authenticate(&state, &headers, peer)?;
    let Query(query) = query.map_err(bad_query)?;
    let raw = required(query.download_path, "downloadPath")?;

    let plan = state
        .delivery
        .plan_download(&raw, query.download_type)
        .map_err(|err| refused(err, &raw, &caller, peer))?;
    stream(&state, &method, plan, caller).await
}

/// GET /download/patch - patch bundle joined directly under the root.
pub(crate) async fn download_patch(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let caller = authenticate(&state, &headers, peer)?;
    let Query(query) = query.map_err(bad_query)?;
    let raw = required(query.download_path, "downloadPath")?;

    let plan = state
        .delivery
        .plan_patch(&raw, query.download_type)
        .map_err(|err| refused(err, &raw, &caller, peer))?;
    stream(&state, &method, plan, caller).await
}

/// GET /download/music - inline playback, seekable.
pub(crate) async fn play_music(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<MusicQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let caller = authenticate(&state, &headers, peer)?;
    let Query(query) = query.map_err(bad_query)?;
    let raw = required(query.play_music_path, "playMusicPath")?;

    let plan = state
        .delivery
        .plan_music(&raw, range_header(&headers))
        .map_err(|err| refused(err, &raw, &caller, peer))?;
    stream(&state, &method, plan, caller).await
}

/// GET /download/video - inline playback, seekable.
pub(crate) async fn play_video(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<VideoQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let caller = authenticate(&state, &headers, peer)?;
    let Query(query) = query.map_err(bad_query)?;
    let raw = required(query.play_video_path, "playVideoPath")?;

    let plan = state
        .delivery
        .plan_video(&raw, range_header(&headers))
        .map_err(|err| refused(err, &raw, &caller, peer))?;
    stream(&state, &method, plan, caller).await
}

/// GET /health
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /metrics - Prometheus text exposition.
pub(crate) async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let render = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::NotFound("metrics are disabled".to_string()))?;
    Ok((
        [(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        render(),
    )
        .into_response())
}

fn authenticate(state: &AppState, headers: &HeaderMap, peer: SocketAddr) -> Result<Caller, AppError> {
    state.auth.authenticate(headers, peer).map_err(|err| {
        crate::metrics::record_rejected("unauthorized");
        log_audit_event(AuditEvent::AuthFailure {
            remote_addr: peer,
            reason: err.to_string(),
        });
        AppError::from(err)
    })
}

fn bad_query(rejection: QueryRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => {
            crate::metrics::record_rejected("bad_request");
            Err(AppError::BadRequest(format!(
                "missing required query parameter '{name}'"
            )))
        },
    }
}

/// A non-ASCII Range header is still a Range header; parsing rejects it.
fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(RANGE).map(|value| value.to_str().unwrap_or_default())
}

fn refused(err: DeliveryError, raw: &str, caller: &Caller, peer: SocketAddr) -> AppError {
    match &err {
        DeliveryError::Forbidden { .. } => log_audit_event(AuditEvent::PathTraversalBlocked {
            path: raw.to_string(),
            remote_addr: peer,
            user_id: caller.user_id.clone(),
        }),
        DeliveryError::InvalidRange { header, .. } => log_audit_event(AuditEvent::RangeRejected {
            path: raw.to_string(),
            range: header.clone(),
            remote_addr: peer,
        }),
        _ => {},
    }
    AppError::from(err)
}

/// HEAD answers from the plan alone: no record, no pump.
async fn stream(
    state: &AppState,
    method: &Method,
    plan: DeliveryPlan,
    caller: Caller,
) -> Result<Response, AppError> {
    if *method == Method::HEAD {
        debug!(kind = plan.kind.as_str(), path = %plan.raw_path, "Answering HEAD without streaming");
        return Ok(head_response(plan.head(), Body::empty()));
    }

    let (mut sink, pending) = channel_sink(SINK_CAPACITY);
    let delivery = state.delivery.clone();

    tokio::spawn(async move {
        let report = delivery.execute(plan, &caller, &mut sink).await;
        if let StreamOutcome::Failure(err) = &report.outcome {
            sink.abort(err.to_string());
        }
    });

    pending
        .into_response()
        .await
        .ok_or_else(|| AppError::Internal("stream ended before the response head".to_string()))
}
