//! `depot serve` - run the delivery server.

use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AuditBackendKind, DepotConfig};
use crate::delivery::{AuditStore, Delivery, StaticRoot, TracingReporter};
use crate::http::{self, AppState, TrustedHeaderAuth};

#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Configuration file (default: ./depot.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Static root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Download sub-folder below the static root
    #[arg(long)]
    pub download_folder: Option<String>,

    /// Path of the redb audit database
    #[arg(long)]
    pub audit_db: Option<PathBuf>,

    /// Keep transfer records in memory only
    #[arg(long, conflicts_with = "audit_db")]
    pub memory_audit: bool,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_logs: bool,
}

impl ServeArgs {
    /// Apply CLI flags over file and environment settings.
    pub fn apply(&self, config: &mut DepotConfig) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(root) = &self.root {
            config.storage.static_root = Some(root.clone());
        }
        if let Some(folder) = &self.download_folder {
            config.storage.download_folder.clone_from(folder);
        }
        if let Some(path) = &self.audit_db {
            config.audit.backend = AuditBackendKind::Redb;
            config.audit.path = Some(path.clone());
        }
        if self.memory_audit {
            config.audit.backend = AuditBackendKind::Memory;
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the static root or audit
/// store cannot be opened, or the listener cannot be bound.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;
    args.apply(&mut config);

    crate::logging::init_tracing(&config.logging.level, config.logging.json);

    let validation = config.validate()?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    let state = build_state(&config)?;
    let router = http::router(state, &config.server.route_prefix);
    let addr = resolve_addr(&config.server.host, config.server.port).await?;

    info!(
        root = %config.static_root()?.display(),
        download_folder = %config.storage.download_folder,
        prefix = %config.server.route_prefix,
        audit = ?config.audit.backend,
        "Starting depot"
    );
    http::serve(addr, router).await
}

/// Wire the delivery core and HTTP state from configuration.
///
/// # Errors
///
/// Returns an error if the static root, audit store, auth header or metrics
/// recorder cannot be set up.
pub fn build_state(config: &DepotConfig) -> Result<AppState> {
    let root = StaticRoot::new(config.static_root()?, &config.storage.download_folder)?;

    let store = match config.audit.backend {
        AuditBackendKind::Redb => {
            let path = config.audit_path()?;
            info!(path = %path.display(), "Opening audit store");
            AuditStore::file(&path)?
        },
        AuditBackendKind::Memory => AuditStore::memory(),
    };

    let delivery = Delivery::new(root, store, Arc::new(TracingReporter));
    let auth = TrustedHeaderAuth::new(&config.auth.user_header, config.auth.trust_forwarded_for)
        .context("Invalid auth.user_header")?;
    let state = AppState::new(delivery, Arc::new(auth));

    #[cfg(feature = "prometheus")]
    let state = if config.server.metrics {
        let handle = crate::metrics::install_prometheus()?;
        state.with_metrics(Arc::new(move || handle.render()))
    } else {
        state
    };

    Ok(state)
}

async fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("No address found for {host}:{port}"))
}
