//! Security audit logging for refused download requests.
//!
//! Emitted on the `audit` target next to the `transfer_failed` events written
//! by [`crate::delivery::TracingReporter`], so one filter captures both.

use std::net::SocketAddr;
use tracing::{info, warn};

/// Security-relevant request outcomes.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// Request arrived without a usable identity.
    AuthFailure {
        remote_addr: SocketAddr,
        reason: String,
    },
    /// Requested path escaped the static root.
    PathTraversalBlocked {
        path: String,
        remote_addr: SocketAddr,
        user_id: String,
    },
    /// Range header could not be satisfied.
    RangeRejected {
        path: String,
        range: String,
        remote_addr: SocketAddr,
    },
}

/// Log an audit event with structured fields.
pub fn log_audit_event(event: AuditEvent) {
    match event {
        AuditEvent::AuthFailure {
            remote_addr,
            reason,
        } => {
            warn!(
                target: "audit",
                event_type = "auth_failure",
                %remote_addr,
                %reason,
                "Authentication failed"
            );
        },
        AuditEvent::PathTraversalBlocked {
            path,
            remote_addr,
            user_id,
        } => {
            warn!(
                target: "audit",
                event_type = "path_traversal_blocked",
                %path,
                %remote_addr,
                %user_id,
                "Path traversal attempt blocked"
            );
        },
        AuditEvent::RangeRejected {
            path,
            range,
            remote_addr,
        } => {
            info!(
                target: "audit",
                event_type = "range_rejected",
                %path,
                %range,
                %remote_addr,
                "Unsatisfiable range request"
            );
        },
    }
}
