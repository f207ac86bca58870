//! Backend trait for the audit store.
//!
//! Defines the interface every transfer-record backend implements, so the
//! persistence technology stays pluggable (redb, memory, SQL, etc.).

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::types::TransferRecord;

/// Backend trait for transfer-record persistence.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// Writes are always scoped to a single record id.
#[async_trait]
pub trait AuditBackend: Send + Sync + 'static {
    /// Persists a newly created record.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn create_record(&self, record: &TransferRecord) -> Result<()>;

    /// Overwrites an existing record with its new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or the write fails.
    async fn update_record(&self, record: &TransferRecord) -> Result<()>;

    /// Fetches a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn get_record(&self, id: Uuid) -> Result<Option<TransferRecord>>;

    /// Lists up to `limit` records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn list_records(&self, limit: usize) -> Result<Vec<TransferRecord>>;
}
