//! Per-endpoint delivery: resolve, parse, track, stream, finalize.
//!
//! Planning ([`Delivery::plan_download`] and friends) does everything that can
//! fail before a byte is sent. [`Delivery::execute`] then owns the stream and
//! the transfer record.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use super::error::Result;
use super::pump::{self, Disposition, StreamOutcome, StreamPump};
use super::range::{self, ByteRange};
use super::record::{AuditStore, TransferKind, TransferLedger, TransferMeta, TransferRecord};
use super::report::ErrorReporter;
use super::resolver::{ResolvedPath, RootScope, StaticRoot};
use super::sink::{ResponseHead, ResponseSink};
use crate::metrics;

/// Authenticated identity of the requesting client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub ip: IpAddr,
}

/// What [`Delivery::execute`] will send.
#[derive(Debug, Clone)]
pub enum PlanMode {
    /// Whole file, tracked by a transfer record.
    Full {
        disposition: Disposition,
        label: Option<String>,
    },
    /// One byte window, untracked.
    Partial(ByteRange),
}

/// A request that passed resolution and range parsing.
#[derive(Debug, Clone)]
pub struct DeliveryPlan {
    pub kind: TransferKind,
    pub raw_path: String,
    pub resolved: ResolvedPath,
    pub mode: PlanMode,
}

impl DeliveryPlan {
    /// Whether the plan will create a transfer record.
    pub fn is_tracked(&self) -> bool {
        matches!(self.mode, PlanMode::Full { .. })
    }

    /// The head [`Delivery::execute`] would send, for answering HEAD.
    pub fn head(&self) -> ResponseHead {
        let mime = self.resolved.mime();
        match &self.mode {
            PlanMode::Full { disposition, .. } => pump::full_head(
                mime,
                self.resolved.file_name(),
                self.resolved.file_size(),
                *disposition,
            ),
            PlanMode::Partial(range) => pump::partial_head(mime, *range),
        }
    }
}

/// Result of [`Delivery::execute`].
#[derive(Debug)]
pub struct DeliveryReport {
    pub outcome: StreamOutcome,
    /// Final state of the transfer record; `None` for ranged requests.
    pub record: Option<TransferRecord>,
}

/// Delivery orchestrator with its injected collaborators.
#[derive(Clone)]
pub struct Delivery {
    root: Arc<StaticRoot>,
    ledger: TransferLedger,
    pump: StreamPump,
}

impl Delivery {
    pub fn new(root: StaticRoot, store: AuditStore, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            root: Arc::new(root),
            ledger: TransferLedger::new(store, reporter),
            pump: StreamPump::default(),
        }
    }

    /// Replace the default pump (chunk size).
    #[must_use]
    pub fn with_pump(mut self, pump: StreamPump) -> Self {
        self.pump = pump;
        self
    }

    pub fn root(&self) -> &StaticRoot {
        &self.root
    }

    /// Attachment download below the download folder.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `NotFound` from path resolution.
    pub fn plan_download(&self, raw: &str, download_type: Option<String>) -> Result<DeliveryPlan> {
        self.plan_attachment(TransferKind::Download, RootScope::Download, raw, download_type)
    }

    /// Patch-bundle download joined directly under the root.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `NotFound` from path resolution.
    pub fn plan_patch(&self, raw: &str, download_type: Option<String>) -> Result<DeliveryPlan> {
        self.plan_attachment(TransferKind::Patch, RootScope::Direct, raw, download_type)
    }

    /// Music playback, ranged when `range_header` is present.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `NotFound` or `InvalidRange`.
    pub fn plan_music(&self, raw: &str, range_header: Option<&str>) -> Result<DeliveryPlan> {
        self.plan_playback(TransferKind::Music, raw, range_header)
    }

    /// Video playback, ranged when `range_header` is present.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `NotFound` or `InvalidRange`.
    pub fn plan_video(&self, raw: &str, range_header: Option<&str>) -> Result<DeliveryPlan> {
        self.plan_playback(TransferKind::Video, raw, range_header)
    }

    fn plan_attachment(
        &self,
        kind: TransferKind,
        scope: RootScope,
        raw: &str,
        label: Option<String>,
    ) -> Result<DeliveryPlan> {
        let resolved = self.resolve(scope, raw)?;
        Ok(DeliveryPlan {
            kind,
            raw_path: raw.to_string(),
            resolved,
            mode: PlanMode::Full {
                disposition: Disposition::Attachment,
                label,
            },
        })
    }

    fn plan_playback(
        &self,
        kind: TransferKind,
        raw: &str,
        range_header: Option<&str>,
    ) -> Result<DeliveryPlan> {
        let resolved = self.resolve(RootScope::Direct, raw)?;
        let mode = match range::parse(range_header, resolved.file_size()).inspect_err(reject)? {
            Some(range) => PlanMode::Partial(range),
            None => PlanMode::Full {
                disposition: Disposition::Inline,
                label: None,
            },
        };
        Ok(DeliveryPlan {
            kind,
            raw_path: raw.to_string(),
            resolved,
            mode,
        })
    }

    fn resolve(&self, scope: RootScope, raw: &str) -> Result<ResolvedPath> {
        self.root.resolve(scope, raw).inspect_err(reject)
    }

    /// Stream a planned delivery into `sink`.
    ///
    /// Full plans persist a `pending` record before the first byte and
    /// finalize it from the stream outcome. Ranged plans are not recorded.
    pub async fn execute<S>(&self, plan: DeliveryPlan, caller: &Caller, sink: &mut S) -> DeliveryReport
    where
        S: ResponseSink + ?Sized,
    {
        let kind = plan.kind.as_str();
        match plan.mode {
            PlanMode::Partial(range) => {
                debug!(
                    kind,
                    path = %plan.raw_path,
                    content_range = %range.content_range(),
                    "Serving range request"
                );
                metrics::record_range_request(kind);
                let outcome = self.pump.stream_range(&plan.resolved, range, sink).await;
                if let StreamOutcome::Failure(err) = &outcome {
                    debug!(kind, path = %plan.raw_path, error = %err, "Range stream aborted");
                }
                metrics::record_bytes_sent(kind, outcome.bytes_sent());
                DeliveryReport {
                    outcome,
                    record: None,
                }
            },
            PlanMode::Full { disposition, label } => {
                let file_size = plan.resolved.file_size();
                let transfer = self
                    .ledger
                    .create(TransferMeta {
                        user_id: caller.user_id.clone(),
                        ip: caller.ip,
                        path: plan.raw_path,
                        kind: plan.kind,
                        label,
                        file_size,
                    })
                    .await;

                let outcome = self
                    .pump
                    .stream_full(&plan.resolved, file_size, disposition, sink)
                    .await;
                transfer.finalize(&outcome).await;

                metrics::record_transfer(kind, transfer.snapshot().status.as_str());
                metrics::record_bytes_sent(kind, outcome.bytes_sent());
                DeliveryReport {
                    outcome,
                    record: Some(transfer.snapshot()),
                }
            },
        }
    }
}

fn reject(err: &super::error::DeliveryError) {
    metrics::record_rejected(err.kind().as_str());
}
