//! Transfer lifecycle: one pending row, exactly one terminal transition.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::AuditStore;
use super::types::{TransferMeta, TransferRecord, TransferStatus};
use crate::delivery::error::DeliveryError;
use crate::delivery::pump::StreamOutcome;
use crate::delivery::report::ErrorReporter;

/// Creates tracked transfers against an audit store.
#[derive(Clone)]
pub struct TransferLedger {
    store: AuditStore,
    reporter: Arc<dyn ErrorReporter>,
}

impl TransferLedger {
    pub fn new(store: AuditStore, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { store, reporter }
    }

    /// Persist a `pending` record and return its handle.
    ///
    /// A store failure is logged and does not prevent the transfer.
    pub async fn create(&self, meta: TransferMeta) -> TrackedTransfer {
        let record = TransferRecord::pending(meta);
        let persisted = match self.store.create_record(&record).await {
            Ok(()) => true,
            Err(e) => {
                let err = DeliveryError::PersistenceFailure(e);
                warn!(record_id = %record.id, error = %err, "Failed to persist pending transfer record");
                false
            },
        };

        info!(
            record_id = %record.id,
            kind = record.kind.as_str(),
            user_id = %record.user_id,
            path = %record.path,
            file_size = record.file_size,
            "Transfer started"
        );

        TrackedTransfer {
            record: Mutex::new(record),
            persisted: AtomicBool::new(persisted),
            store: self.store.clone(),
            reporter: Arc::clone(&self.reporter),
        }
    }
}

/// Handle to one in-flight transfer record.
///
/// [`complete`](Self::complete) and [`fail`](Self::fail) race safely: the
/// first call moves the record to its terminal state, every later call is a
/// no-op that returns `false`.
pub struct TrackedTransfer {
    record: Mutex<TransferRecord>,
    persisted: AtomicBool,
    store: AuditStore,
    reporter: Arc<dyn ErrorReporter>,
}

impl TrackedTransfer {
    pub fn id(&self) -> Uuid {
        self.record.lock().id
    }

    /// Current in-memory state of the record.
    pub fn snapshot(&self) -> TransferRecord {
        self.record.lock().clone()
    }

    /// Mark the transfer successful.
    pub async fn complete(&self) -> bool {
        let Some(record) = self.transition(TransferStatus::Success) else {
            return false;
        };
        info!(
            record_id = %record.id,
            duration_ms = record.duration_ms.unwrap_or_default(),
            "Transfer completed"
        );
        self.persist(&record).await;
        true
    }

    /// Mark the transfer failed and forward `error` to the reporter.
    pub async fn fail(&self, error: &DeliveryError) -> bool {
        let Some(record) = self.transition(TransferStatus::Failed) else {
            return false;
        };
        warn!(record_id = %record.id, error = %error, "Transfer failed");
        self.persist(&record).await;
        self.reporter.report(error, record.ip).await;
        true
    }

    /// Drive the terminal transition from a stream outcome.
    pub async fn finalize(&self, outcome: &StreamOutcome) -> bool {
        match outcome {
            StreamOutcome::Success { .. } => self.complete().await,
            StreamOutcome::Failure(error) => self.fail(error).await,
        }
    }

    fn transition(&self, status: TransferStatus) -> Option<TransferRecord> {
        let mut record = self.record.lock();
        if record.finish(status, Utc::now()) {
            Some(record.clone())
        } else {
            debug!(
                record_id = %record.id,
                current = record.status.as_str(),
                ignored = status.as_str(),
                "Transfer already finalized"
            );
            None
        }
    }

    async fn persist(&self, record: &TransferRecord) {
        // A record whose pending row never landed is written in full instead.
        let result = if self.persisted.load(Ordering::Acquire) {
            self.store.update_record(record).await
        } else {
            self.store.create_record(record).await
        };

        match result {
            Ok(()) => self.persisted.store(true, Ordering::Release),
            Err(e) => {
                let err = DeliveryError::PersistenceFailure(e);
                warn!(record_id = %record.id, error = %err, "Failed to persist transfer record");
            },
        }
    }
}
