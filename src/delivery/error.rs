//! Delivery error types.
//!
//! Every failure the delivery core can produce belongs to one of a small,
//! closed set of kinds ([`DeliveryErrorKind`]). Transport layers map kinds to
//! status codes; the core itself never looks at status codes.

use std::path::PathBuf;

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Closed set of delivery failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryErrorKind {
    /// The requested path escapes the configured root.
    Forbidden,
    /// The resolved path does not exist or is not a regular file.
    NotFound,
    /// The Range header is malformed or unsatisfiable.
    InvalidRange,
    /// I/O failed mid-transfer or the client went away.
    StreamFailure,
    /// The audit store rejected a write.
    PersistenceFailure,
}

impl DeliveryErrorKind {
    /// Stable snake_case name, used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::InvalidRange => "invalid_range",
            Self::StreamFailure => "stream_failure",
            Self::PersistenceFailure => "persistence_failure",
        }
    }
}

impl std::fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery errors with structured context.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Path escapes the static root.
    #[error("access denied: {path:?} escapes the static root")]
    Forbidden { path: String },

    /// Target file is missing.
    #[error("file not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Range header cannot be served.
    #[error("invalid range {header:?}: {reason}")]
    InvalidRange {
        header: String,
        reason: &'static str,
        file_size: u64,
    },

    /// Transfer interrupted after it started.
    #[error("stream failed after {bytes_sent} bytes: {source}")]
    StreamFailure {
        bytes_sent: u64,
        #[source]
        source: std::io::Error,
    },

    /// Audit store write failed.
    #[error("audit store error: {0}")]
    PersistenceFailure(#[source] anyhow::Error),
}

impl DeliveryError {
    /// Create a forbidden-path error.
    pub fn forbidden(path: impl Into<String>) -> Self {
        Self::Forbidden { path: path.into() }
    }

    /// Create a not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an invalid-range error.
    pub fn invalid_range(header: impl Into<String>, reason: &'static str, file_size: u64) -> Self {
        Self::InvalidRange {
            header: header.into(),
            reason,
            file_size,
        }
    }

    /// Create a stream failure.
    pub fn stream_failure(bytes_sent: u64, source: std::io::Error) -> Self {
        Self::StreamFailure { bytes_sent, source }
    }

    /// The closed kind of this error.
    pub fn kind(&self) -> DeliveryErrorKind {
        match self {
            Self::Forbidden { .. } => DeliveryErrorKind::Forbidden,
            Self::NotFound { .. } => DeliveryErrorKind::NotFound,
            Self::InvalidRange { .. } => DeliveryErrorKind::InvalidRange,
            Self::StreamFailure { .. } => DeliveryErrorKind::StreamFailure,
            Self::PersistenceFailure(_) => DeliveryErrorKind::PersistenceFailure,
        }
    }
}
