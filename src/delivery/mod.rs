//! Transport-independent file delivery core.
//!
//! Components, leaf-first:
//!
//! - [`resolver`] - joins caller paths below the [`StaticRoot`], blocks escapes
//! - [`range`] - parses `Range: bytes=<start>-<end>?`
//! - [`record`] - transfer audit records and their stores
//! - [`pump`] - chunked, backpressured copying into a [`ResponseSink`]
//! - [`orchestrator`] - per-endpoint composition ([`Delivery`])
//!
//! Nothing here knows about HTTP status codes; [`crate::http`] maps
//! [`DeliveryErrorKind`] at the boundary.

pub mod error;
pub mod orchestrator;
pub mod pump;
pub mod range;
pub mod record;
pub mod report;
pub mod resolver;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DeliveryError, DeliveryErrorKind, Result};
pub use orchestrator::{Caller, Delivery, DeliveryPlan, DeliveryReport, PlanMode};
pub use pump::{Disposition, StreamOutcome, StreamPump};
pub use range::ByteRange;
pub use record::{
    AuditBackend, AuditStore, MemoryAuditBackend, RedbAuditBackend, TrackedTransfer,
    TransferKind, TransferLedger, TransferMeta, TransferRecord, TransferStatus,
};
pub use report::{ErrorReporter, TracingReporter};
pub use resolver::{ResolvedPath, RootScope, StaticRoot, guess_content_type};
pub use sink::{ResponseHead, ResponseSink};
