//! HTTP surface: router, shared state and server loop.
//!
//! # Endpoints
//!
//! Download routes, nested under the configured prefix (default `/apis`):
//!
//! - `GET /download?downloadPath=&downloadType=` - attachment download
//! - `GET /download/music?playMusicPath=` - inline, `Range` aware
//! - `GET /download/video?playVideoPath=` - inline, `Range` aware
//! - `GET /download/patch?downloadPath=&downloadType=` - attachment, path under the root
//!
//! Operational routes at the top level:
//!
//! - `GET /health`
//! - `GET /metrics` (404 when no recorder is installed)

pub mod audit;
pub mod auth;
pub mod error;
mod handlers;
pub mod sink;
pub mod types;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::Method;
use axum::http::header::{ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use auth::{AuthError, Authenticator, TrustedHeaderAuth};
pub use error::AppError;
pub use sink::{ChannelSink, PendingResponse, channel_sink, head_response};

use crate::delivery::Delivery;

/// Renders the metrics exposition text.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub delivery: Delivery,
    pub auth: Arc<dyn Authenticator>,
    pub metrics: Option<MetricsRender>,
}

impl AppState {
    pub fn new(delivery: Delivery, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            delivery,
            auth,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `render`.
    #[must_use]
    pub fn with_metrics(mut self, render: MetricsRender) -> Self {
        self.metrics = Some(render);
        self
    }
}

/// Build the application router.
///
/// `prefix` is trimmed of trailing slashes; empty or `/` mounts the download
/// routes at the top level.
pub fn router(state: AppState, prefix: &str) -> Router {
    let downloads = Router::new()
        .route("/download", get(handlers::download))
        .route("/download/music", get(handlers::play_music))
        .route("/download/video", get(handlers::play_video))
        .route("/download/patch", get(handlers::download_patch));

    let prefix = prefix.trim_end_matches('/');
    let api = if prefix.is_empty() {
        downloads
    } else {
        Router::new().nest(prefix, downloads)
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION, CONTENT_RANGE, ACCEPT_RANGES, CONTENT_LENGTH]);

    api.route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local = listener.local_addr().context("Failed to read local address")?;
    info!(addr = %local, "depot listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    info!("depot stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
