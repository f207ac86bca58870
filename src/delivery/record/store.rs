//! High-level `AuditStore` wrapper over backend implementations.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::backend::AuditBackend;
use super::memory::MemoryAuditBackend;
use super::redb::RedbAuditBackend;
use super::types::TransferRecord;

/// Audit store handle.
///
/// Wraps an [`AuditBackend`] so callers do not care which persistence
/// technology sits underneath. `AuditStore` is `Clone` and cheap to share.
///
/// # Example
///
/// ```ignore
/// use depot::delivery::AuditStore;
///
/// let store = AuditStore::memory();
/// let store = AuditStore::file("~/.depot/audit.redb")?;
/// ```
#[derive(Clone)]
pub struct AuditStore {
    backend: Arc<dyn AuditBackend>,
}

impl AuditStore {
    /// Creates a store backed by a file-based redb database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let backend = RedbAuditBackend::open(path)?;
        Ok(Self {
            backend: Arc::new(backend),
        })
    }

    /// Creates a store backed by memory. All data is lost on exit.
    pub fn memory() -> Self {
        Self {
            backend: Arc::new(MemoryAuditBackend::new()),
        }
    }

    /// Creates a store with a custom backend.
    pub fn custom<B: AuditBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn create_record(&self, record: &TransferRecord) -> Result<()> {
        self.backend.create_record(record).await
    }

    /// Persists the new state of an existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is unknown or the write fails.
    pub async fn update_record(&self, record: &TransferRecord) -> Result<()> {
        self.backend.update_record(record).await
    }

    /// Fetches a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn get_record(&self, id: Uuid) -> Result<Option<TransferRecord>> {
        self.backend.get_record(id).await
    }

    /// Lists up to `limit` records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn list_records(&self, limit: usize) -> Result<Vec<TransferRecord>> {
        self.backend.list_records(limit).await
    }
}
