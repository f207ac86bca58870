//! `depot records` - print recent transfer records.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

use crate::delivery::{AuditStore, TransferRecord};
use crate::utils::{format_bytes, format_duration_ms};

/// Print the newest `limit` records from the redb audit store.
///
/// # Errors
///
/// Returns an error if the database does not exist or cannot be read.
pub async fn execute(
    config_path: Option<&Path>,
    audit_db: Option<PathBuf>,
    limit: usize,
) -> Result<()> {
    let path = match audit_db {
        Some(path) => path,
        None => super::load_config(config_path)?.audit_path()?,
    };
    if !path.exists() {
        bail!("No audit database at {}", path.display());
    }

    let store = AuditStore::file(&path)?;
    let records = store.list_records(limit).await?;
    if records.is_empty() {
        println!("No transfer records in {}", path.display());
        return Ok(());
    }

    println!(
        "{:<36}  {:<8}  {:<16}  {:<12}  {:>10}  {:>8}  PATH",
        "ID", "STATUS", "LABEL", "USER", "SIZE", "TIME"
    );
    for record in &records {
        println!("{}", format_row(record));
    }
    Ok(())
}

fn format_row(record: &TransferRecord) -> String {
    format!(
        "{:<36}  {:<8}  {:<16}  {:<12}  {:>10}  {:>8}  {}",
        record.id,
        record.status.as_str(),
        record.label,
        record.user_id,
        format_bytes(record.file_size),
        format_duration_ms(record.duration_ms),
        record.path
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{TransferKind, TransferMeta};

    #[test]
    fn test_row_shows_pending_duration_as_dash() {
        let record = TransferRecord::pending(TransferMeta {
            user_id: "u-1".to_string(),
            ip: "127.0.0.1".parse().unwrap(),
            path: "a/b.zip".to_string(),
            kind: TransferKind::Patch,
            label: None,
            file_size: 2048,
        });
        let row = format_row(&record);
        assert!(row.contains("pending"));
        assert!(row.contains("Patch Download"));
        assert!(row.contains("2.0 KB"));
        assert!(row.trim_end().ends_with("a/b.zip"));
        assert!(row.contains(" - "));
    }

    #[tokio::test]
    async fn test_missing_database_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = execute(None, Some(tmp.path().join("none.redb")), 5).await;
        assert!(result.is_err());
    }
}
