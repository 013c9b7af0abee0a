//! Configuration management for the AgriServe access-control core
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (AGRISERVE_* prefix, highest precedence)
//! 2. agriserve.local.toml (gitignored, local overrides)
//! 3. agriserve.toml (git-tracked, project config)
//! 4. ~/.config/agriserve/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use agriserve_rbac::{PiiPolicy, SensitiveField};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main access-control configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub audit: AuditConfig,
    pub pii: PiiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// When false, audit events are discarded.
    pub enabled: bool,
    pub queue_capacity: usize,
    pub write_timeout_ms: u64,
    /// Inserts allowed to run at once, including ones past their timeout.
    pub max_in_flight_writes: usize,
    /// JSON-lines file used by the local audit store.
    pub store_path: PathBuf,
    /// Resource name recorded for PII audit events.
    pub resource: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 1024,
            write_timeout_ms: 2000,
            max_in_flight_writes: 4,
            store_path: Paths::state_dir("").join("audit.jsonl"),
            resource: "user_profiles".to_string(),
        }
    }
}

impl AuditConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PiiConfig {
    /// Sensitive fields added on top of the built-in set.
    pub extra_fields: Vec<SensitiveField>,
}

impl PiiConfig {
    /// Builds the redaction policy: built-in fields plus `extra_fields`.
    pub fn policy(&self) -> PiiPolicy {
        PiiPolicy::default().with_fields(self.extra_fields.iter().cloned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, e.g. `info` or `agriserve_audit=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AccessConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Rejects settings the audit worker cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "audit.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.audit.write_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "audit.write_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.audit.max_in_flight_writes == 0 {
            return Err(ConfigError::ValidationError(
                "audit.max_in_flight_writes must be at least 1".to_string(),
            ));
        }
        if self.audit.resource.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "audit.resource must not be empty".to_string(),
            ));
        }
        if let Some(field) = self.pii.extra_fields.iter().find(|f| f.name.is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "pii.extra_fields entry with kind {:?} has an empty name",
                field.kind
            )));
        }
        Ok(())
    }

    /// Renders the configuration as TOML, in the layout of `agriserve.toml`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.audit.store_path.is_relative() {
            self.audit.store_path = base.join(&self.audit.store_path);
        }
    }
}
