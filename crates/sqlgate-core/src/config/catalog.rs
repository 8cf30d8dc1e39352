//! Schema catalog configuration (wire shape).
//!
//! This is the structure handed to the engine by the external config loader.
//! It carries no guarantees on its own; `sqlgate_policy::SchemaCatalog::from_config`
//! is what turns it into a checked, immutable catalog snapshot.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::ConfigError;

/// Catalog configuration as loaded from YAML or JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCatalogConfig {
    /// Monotonically increasing catalog version.
    pub version: u64,

    /// Tables that queries may read from.
    #[serde(default)]
    pub tables: Vec<TableConfig>,

    /// Declared foreign-key edges. These double as the join policy.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyConfig>,

    /// Functions that may appear in a query.
    #[serde(default)]
    pub allowed_functions: Vec<FunctionConfig>,
}

/// A single table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// A foreign-key edge `from_table.from_column -> to_table.to_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyConfig {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// An allowed function and its arity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub name: String,
    pub arity: usize,
}

impl SchemaCatalogConfig {
    /// Load a catalog from a file. `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse a catalog from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Parse a catalog from JSON content.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Builder-style helper: add a table with `(name, type)` columns.
    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.tables.push(TableConfig {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|(n, t)| ColumnConfig {
                    name: n.to_string(),
                    data_type: t.to_string(),
                })
                .collect(),
        });
        self
    }

    /// Builder-style helper: add a foreign-key edge.
    pub fn with_foreign_key(
        mut self,
        from_table: &str,
        from_column: &str,
        to_table: &str,
        to_column: &str,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyConfig {
            from_table: from_table.to_string(),
            from_column: from_column.to_string(),
            to_table: to_table.to_string(),
            to_column: to_column.to_string(),
        });
        self
    }

    /// Builder-style helper: allow a function with the given arity.
    pub fn with_function(mut self, name: &str, arity: usize) -> Self {
        self.allowed_functions.push(FunctionConfig {
            name: name.to_string(),
            arity,
        });
        self
    }
}
