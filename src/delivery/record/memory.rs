//! In-memory audit backend.
//!
//! Non-persistent record storage on top of `DashMap`. Used in tests and when
//! the service runs with `--memory-audit`.

use anyhow::{Result, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::backend::AuditBackend;
use super::types::TransferRecord;

/// In-memory transfer-record backend using DashMap.
///
/// All data is lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryAuditBackend {
    records: DashMap<Uuid, TransferRecord>,
}

impl MemoryAuditBackend {
    /// Creates a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditBackend for MemoryAuditBackend {
    async fn create_record(&self, record: &TransferRecord) -> Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_record(&self, record: &TransferRecord) -> Result<()> {
        match self.records.get_mut(&record.id) {
            Some(mut entry) => {
                *entry = record.clone();
                Ok(())
            },
            None => bail!("Transfer record {} does not exist", record.id),
        }
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<TransferRecord>> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_records(&self, limit: usize) -> Result<Vec<TransferRecord>> {
        let mut records: Vec<TransferRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records.truncate(limit);
        Ok(records)
    }
}
