// Configuration types shared across all SQLGate crates
pub mod config;

// Re-export commonly used config types for convenience
pub use config::{
    AuditConfig, BoundingConfig, BoundingError, ColumnConfig, ConfigError, ForeignKeyConfig,
    FunctionConfig, GateConfig, SchemaCatalogConfig, TableConfig,
};

/// A source position in candidate text. Lines and columns are 1-based; columns count
/// characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Position of the first character of any input.
    pub fn start() -> Self {
        Self::new(1, 1)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
