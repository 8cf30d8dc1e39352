//! Configuration types for SQLGate.
//!
//! Configuration is loaded from a YAML file (`sqlgate.yaml`) and may reference the
//! schema catalog in a separate file:
//!
//! - **sqlgate.yaml**: bounding limits, audit settings, inline catalog or `catalogFile`
//! - **catalog.yaml / catalog.json**: tables, columns, foreign keys, allowed functions

pub mod audit;
pub mod bounding;
pub mod catalog;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use audit::AuditConfig;
pub use bounding::{BoundingConfig, BoundingError};
pub use catalog::{
    ColumnConfig, ForeignKeyConfig, FunctionConfig, SchemaCatalogConfig, TableConfig,
};

/// Complete SQLGate configuration loaded from files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// Inline schema catalog.
    #[serde(default)]
    pub catalog: Option<SchemaCatalogConfig>,

    /// Path to the schema catalog file (alternative to inline).
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,

    /// Row limit and timeout bounds.
    #[serde(default)]
    pub bounding: BoundingConfig,

    /// Audit recording.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration and resolve the catalog file reference.
    ///
    /// A relative `catalogFile` is resolved against the directory of `path`.
    /// The loaded catalog replaces any inline one.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(catalog_file) = &config.catalog_file {
            let catalog_path = if catalog_file.is_absolute() {
                catalog_file.clone()
            } else {
                base_dir.join(catalog_file)
            };
            config.catalog = Some(SchemaCatalogConfig::from_file(&catalog_path)?);
        }

        Ok(config)
    }

    /// The catalog, or an error if none was configured.
    pub fn require_catalog(&self) -> Result<&SchemaCatalogConfig, ConfigError> {
        self.catalog.as_ref().ok_or_else(|| {
            ConfigError::Config("no catalog configured (set `catalog` or `catalogFile`)".into())
        })
    }
}
