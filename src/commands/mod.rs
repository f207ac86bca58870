//! CLI command implementations for depot.
//!
//! - [`serve`] - run the HTTP delivery server
//! - [`check`] - load and validate configuration
//! - [`records`] - print recent transfer records

pub mod check;
pub mod records;
pub mod serve;

use anyhow::Result;
use std::path::Path;

use crate::config::DepotConfig;

/// Load configuration and apply environment overrides.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<DepotConfig> {
    let mut config = DepotConfig::load(path)?;
    config.apply_env();
    Ok(config)
}
