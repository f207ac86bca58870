//! Path utilities for depot's own files.
//!
//! # Base Directories
//! - [`get_depot_dir`] - `~/.depot/` (base directory for all depot data)
//!
//! # Data Files
//! - [`get_audit_db_path`] - `~/.depot/audit.redb` (transfer audit records)

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the depot base directory.
///
/// Resolution order:
/// 1. `DEPOT_HOME` environment variable (if set)
/// 2. `~/.depot/` (default)
pub fn get_depot_dir() -> Result<PathBuf> {
    if let Ok(depot_home) = std::env::var("DEPOT_HOME")
        && !depot_home.is_empty()
    {
        return Ok(PathBuf::from(depot_home));
    }

    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".depot"))
}

/// Get the audit database path: `~/.depot/audit.redb`
pub fn get_audit_db_path() -> Result<PathBuf> {
    Ok(get_depot_dir()?.join("audit.redb"))
}
