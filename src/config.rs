//! Configuration types for the depot server.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. `depot.toml` (or the file given with `--config`)
//! 3. Environment (`DEFAULT_STATIC_PATH`, `DOWNLOAD_FOLDER`)
//! 4. CLI flags, applied by the command layer
//!
//! [`DepotConfig::validate`] separates hard errors from warnings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::constants;
use crate::paths;

/// Environment variable naming the static root.
pub const ENV_STATIC_PATH: &str = "DEFAULT_STATIC_PATH";

/// Environment variable naming the download sub-folder.
pub const ENV_DOWNLOAD_FOLDER: &str = "DOWNLOAD_FOLDER";

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root of `depot.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DepotConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub audit: AuditSection,
    pub auth: AuthSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub route_prefix: String,
    /// Install the Prometheus recorder and serve `/metrics`.
    pub metrics: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_HOST.to_string(),
            port: constants::DEFAULT_PORT,
            route_prefix: constants::DEFAULT_ROUTE_PREFIX.to_string(),
            metrics: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSection {
    pub static_root: Option<PathBuf>,
    pub download_folder: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            static_root: None,
            download_folder: constants::DEFAULT_DOWNLOAD_FOLDER.to_string(),
        }
    }
}

/// Where transfer records are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackendKind {
    #[default]
    Redb,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditSection {
    pub backend: AuditBackendKind,
    /// Defaults to `$DEPOT_HOME/audit.redb`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSection {
    pub user_header: String,
    /// Take the client ip from the first `X-Forwarded-For` hop.
    pub trust_forwarded_for: bool,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            user_header: constants::DEFAULT_USER_HEADER.to_string(),
            trust_forwarded_for: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl DepotConfig {
    /// Load `path`, or `depot.toml` in the current directory if it exists,
    /// or fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing, or any file
    /// that is read contains invalid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default = Path::new(constants::DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load_from(default)
                } else {
                    Ok(Self::default())
                }
            },
        }
    }

    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: DepotConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = get(ENV_STATIC_PATH) {
            self.storage.static_root = Some(PathBuf::from(root));
        }
        if let Some(folder) = get(ENV_DOWNLOAD_FOLDER) {
            self.storage.download_folder = folder;
        }
    }

    /// Configured static root.
    ///
    /// # Errors
    ///
    /// Returns an error if no root was configured anywhere.
    pub fn static_root(&self) -> Result<&Path> {
        self.storage.static_root.as_deref().with_context(|| {
            format!(
                "No static root configured. Set storage.static_root, {ENV_STATIC_PATH} or --root"
            )
        })
    }

    /// Audit database path, defaulting below `$DEPOT_HOME`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn audit_path(&self) -> Result<PathBuf> {
        match &self.audit.path {
            Some(path) => Ok(path.clone()),
            None => paths::get_audit_db_path(),
        }
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every validation failure:
    /// - Missing or empty static root
    /// - Port 0
    /// - Route prefix not starting with `/`
    /// - Download folder that is absolute or climbs out of the root
    /// - Empty user header
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Storage
        match &self.storage.static_root {
            None => errors.push(format!(
                "storage.static_root is not set\n  \
                 Set it in {} or via {ENV_STATIC_PATH}",
                constants::DEFAULT_CONFIG_FILE
            )),
            Some(root) if root.as_os_str().is_empty() => {
                errors.push("storage.static_root cannot be empty".to_string());
            },
            Some(root) if !root.exists() => {
                warnings.push(format!(
                    "Static root does not exist yet: {}\n  \
                     The server will refuse to start until it does",
                    root.display()
                ));
            },
            Some(_) => {},
        }

        let escapes = Path::new(&self.storage.download_folder)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            errors.push(format!(
                "storage.download_folder must be a relative path inside the root (got: '{}')",
                self.storage.download_folder
            ));
        }

        // 2. Server
        if self.server.port == 0 {
            errors.push(
                "Server port cannot be 0. Use a valid port number (1-65535)\n  \
                 Common ports: 3000 (default), 8080, 8000"
                    .to_string(),
            );
        }

        // Warn on system ports (< 1024)
        if self.server.port < 1024 && self.server.port > 0 {
            warnings.push(format!(
                "Server port {} is a system/privileged port (< 1024)\n  \
                 Recommendation: Use ports >= 1024 (e.g., 3000, 8080, 8000) to avoid permission issues",
                self.server.port
            ));
        }

        if !self.server.route_prefix.is_empty() && !self.server.route_prefix.starts_with('/') {
            errors.push(format!(
                "server.route_prefix must start with '/' (got: '{}')",
                self.server.route_prefix
            ));
        }

        // 3. Auth
        if self.auth.user_header.trim().is_empty() {
            errors.push("auth.user_header cannot be empty".to_string());
        }

        // 4. Audit
        if self.audit.backend == AuditBackendKind::Memory {
            warnings.push(
                "Audit backend is 'memory'; transfer records are lost on restart".to_string(),
            );
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}
