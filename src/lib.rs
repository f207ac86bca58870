//! depot - static media and attachment delivery over HTTP.
//!
//! The crate is split into a transport-independent delivery core and a thin
//! HTTP surface:
//!
//! - [`delivery`] - path resolution, range parsing, transfer records,
//!   the stream pump and the per-endpoint orchestrator
//! - [`http`] - axum router, authentication seam, response sink
//! - [`config`] - TOML configuration with environment overrides
//! - [`commands`] - `depot serve`, `depot check` and `depot records`
//!
//! # Example
//!
//! ```no_run
//! use depot::delivery::{AuditStore, Delivery, StaticRoot, TracingReporter};
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let root = StaticRoot::new("/srv/static", "downloads")?;
//! let delivery = Delivery::new(root, AuditStore::memory(), Arc::new(TracingReporter));
//! # let _ = delivery;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod commands;
pub mod config;
pub mod constants;
pub mod delivery;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod paths;
pub mod utils;
