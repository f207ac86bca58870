//! Error reporting for failed transfers.
//!
//! Failed transfers are forwarded, together with the caller's address, to an
//! [`ErrorReporter`]. The default [`TracingReporter`] writes a structured
//! audit event that log pipelines can alert on.

use async_trait::async_trait;
use std::net::IpAddr;
use tracing::warn;

use super::error::DeliveryError;

/// Receives transfer failures.
#[async_trait]
pub trait ErrorReporter: Send + Sync + 'static {
    /// Report `error` raised while serving the client at `ip`.
    async fn report(&self, error: &DeliveryError, ip: IpAddr);
}

/// Reports failures as `audit` tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait]
impl ErrorReporter for TracingReporter {
    async fn report(&self, error: &DeliveryError, ip: IpAddr) {
        warn!(
            target: "audit",
            event_type = "transfer_failed",
            kind = %error.kind(),
            %ip,
            error = %error,
            "Transfer failed"
        );
    }
}
