//! Redb-backed audit backend.
//!
//! Persists transfer records with ACID guarantees, so a crash mid-transfer
//! still leaves the `pending` row on disk.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::backend::AuditBackend;
use super::types::TransferRecord;

/// Table of JSON-encoded transfer records keyed by record id.
pub(crate) const RECORDS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("transfer_records");

/// Redb-backed transfer-record backend.
///
/// `RedbAuditBackend` is `Clone`; clones share the same database handle.
#[derive(Clone)]
pub struct RedbAuditBackend {
    db: Arc<Database>,
}

impl RedbAuditBackend {
    /// Opens or creates a redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created
    /// - Initialization transaction fails to begin or commit
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create audit directory: {}", parent.display())
            })?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open audit database: {}", path.display()))?;

        // Create the table up front so read transactions never miss it
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _table = write_txn
                .open_table(RECORDS_TABLE)
                .context("Failed to initialize records table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        Ok(Self { db: Arc::new(db) })
    }

    fn put_sync(&self, record: &TransferRecord, must_exist: bool) -> Result<()> {
        let key = record.id.to_string();
        let json = serde_json::to_vec(record).context("Failed to serialize transfer record")?;

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(RECORDS_TABLE)
                .context("Failed to open records table")?;

            if must_exist
                && table
                    .get(key.as_str())
                    .with_context(|| format!("Failed to read record '{key}'"))?
                    .is_none()
            {
                bail!("Transfer record {key} does not exist");
            }

            table
                .insert(key.as_str(), json.as_slice())
                .with_context(|| format!("Failed to write record '{key}'"))?;
        }
        write_txn
            .commit()
            .context("Failed to commit record transaction")?;

        Ok(())
    }

    fn get_sync(&self, id: Uuid) -> Result<Option<TransferRecord>> {
        let key = id.to_string();
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(RECORDS_TABLE)
            .context("Failed to open records table")?;

        match table
            .get(key.as_str())
            .with_context(|| format!("Failed to read record '{key}'"))?
        {
            Some(guard) => {
                let record = serde_json::from_slice(guard.value())
                    .with_context(|| format!("Failed to deserialize record '{key}'"))?;
                Ok(Some(record))
            },
            None => Ok(None),
        }
    }

    fn list_sync(&self, limit: usize) -> Result<Vec<TransferRecord>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(RECORDS_TABLE)
            .context("Failed to open records table")?;

        let mut records = Vec::new();
        for item in table.iter().context("Failed to iterate records table")? {
            let (key, value) = item.context("Failed to read record entry")?;
            match serde_json::from_slice::<TransferRecord>(value.value()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(key = key.value(), error = %e, "Skipping unreadable transfer record");
                },
            }
        }

        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl AuditBackend for RedbAuditBackend {
    async fn create_record(&self, record: &TransferRecord) -> Result<()> {
        let backend = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || backend.put_sync(&record, false))
            .await
            .context("Task join error")?
    }

    async fn update_record(&self, record: &TransferRecord) -> Result<()> {
        let backend = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || backend.put_sync(&record, true))
            .await
            .context("Task join error")?
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<TransferRecord>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.get_sync(id))
            .await
            .context("Task join error")?
    }

    async fn list_records(&self, limit: usize) -> Result<Vec<TransferRecord>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.list_sync(limit))
            .await
            .context("Task join error")?
    }
}
