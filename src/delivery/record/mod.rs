//! Transfer audit records with pluggable persistence.
//!
//! A [`TransferRecord`] is written as `pending` right before a full-file
//! transfer starts and moves to `success` or `failed` exactly once.
//!
//! Backends:
//!
//! - **RedbAuditBackend**: persistent storage with ACID guarantees (default)
//! - **MemoryAuditBackend**: non-persistent storage (tests, `--memory-audit`)
//!
//! Implement [`AuditBackend`] to plug in other storage.

mod backend;
mod ledger;
mod memory;
mod redb;
mod store;
mod types;


pub use backend::AuditBackend;
pub use ledger::{TrackedTransfer, TransferLedger};
pub use memory::MemoryAuditBackend;
pub use redb::RedbAuditBackend;
pub use store::AuditStore;
pub use types::{TransferKind, TransferMeta, TransferRecord, TransferStatus};
