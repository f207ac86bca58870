//! `depot check` - validate configuration without serving.

use anyhow::Result;
use std::path::Path;

/// Load, validate and summarize the effective configuration.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or is invalid.
pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let validation = config.validate()?;

    println!("Configuration OK");
    println!("  static root:     {}", config.static_root()?.display());
    println!("  download folder: {}", config.storage.download_folder);
    println!(
        "  listen:          {}:{}{}",
        config.server.host, config.server.port, config.server.route_prefix
    );
    println!("  audit backend:   {:?}", config.audit.backend);

    if validation.has_warnings() {
        println!("\nWarnings:");
        for warning in &validation.warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}
