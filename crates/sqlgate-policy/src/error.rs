//! Policy violation and catalog error types.
//!
//! A [`PolicyViolation`] is the outcome of a failed policy check on a parsed
//! statement. A [`CatalogError`] means the catalog itself could not be built or
//! published.

use serde::Serialize;
use sqlgate_core::Position;
use std::fmt;

/// Error type for policy check failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyViolation {
    /// The kind of violation.
    pub kind: ViolationKind,
    /// Human-readable error message.
    pub message: String,
    /// Where in the candidate the offending identifier starts.
    pub position: Position,
}

impl PolicyViolation {
    /// Create a new policy violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    /// Stable rejection code.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    // =========================================================================
    // TABLE ERRORS
    // =========================================================================

    /// Create a table not allowed error.
    pub fn table_not_allowed(table: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::TableNotAllowed,
            format!("Table '{}' is not in the schema catalog", table),
            position,
        )
    }

    /// Create a schema-qualified table error.
    pub fn schema_qualified_table(schema: &str, table: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::TableNotAllowed,
            format!(
                "Table '{}.{}' is schema-qualified; only unqualified catalog tables are allowed",
                schema, table
            ),
            position,
        )
    }

    /// Create a catalog reference error.
    pub fn catalog_reference(name: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::CatalogReference,
            format!("'{}' refers to a system catalog or schema", name),
            position,
        )
    }

    // =========================================================================
    // COLUMN ERRORS
    // =========================================================================

    /// Create a column not allowed error.
    pub fn column_not_allowed(column: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::ColumnNotAllowed,
            format!("Column '{}' does not belong to any table in scope", column),
            position,
        )
    }

    /// Create a column not in table error.
    pub fn column_not_in_table(table: &str, column: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::ColumnNotAllowed,
            format!("Column '{}' is not allowed on table '{}'", column, table),
            position,
        )
    }

    /// Create an unknown qualifier error.
    pub fn unknown_qualifier(qualifier: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::ColumnNotAllowed,
            format!("'{}' is not a table or alias in scope", qualifier),
            position,
        )
    }

    /// Create a wildcard without tables error.
    pub fn wildcard_without_tables(position: Position) -> Self {
        Self::new(
            ViolationKind::ColumnNotAllowed,
            "'*' requires at least one table in FROM",
            position,
        )
    }

    /// Create an ambiguous column error.
    pub fn ambiguous_column(column: &str, tables: &[&str], position: Position) -> Self {
        Self::new(
            ViolationKind::AmbiguousColumn,
            format!(
                "Column '{}' is ambiguous; it exists in {}",
                column,
                tables.join(", ")
            ),
            position,
        )
    }

    /// Create an ambiguous select-list alias error.
    pub fn ambiguous_alias(alias: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::AmbiguousColumn,
            format!("Alias '{}' names more than one select-list item", alias),
            position,
        )
    }

    /// Create a duplicate binding error.
    pub fn duplicate_binding(name: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::AmbiguousColumn,
            format!("Table name or alias '{}' is used more than once", name),
            position,
        )
    }

    // =========================================================================
    // JOIN ERRORS
    // =========================================================================

    /// Create a join not in schema graph error.
    pub fn join_not_in_graph(table: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::JoinNotInSchemaGraph,
            format!(
                "Join to '{}' is not backed by a declared foreign key with a matching equality in ON",
                table
            ),
            position,
        )
    }

    // =========================================================================
    // FUNCTION ERRORS
    // =========================================================================

    /// Create a disallowed function error.
    pub fn disallowed_function(name: &str, position: Position) -> Self {
        Self::new(
            ViolationKind::DisallowedFunction,
            format!("Function '{}' is not allowed", name),
            position,
        )
    }

    /// Create a function arity error.
    pub fn function_arity(name: &str, given: usize, allowed: &[usize], position: Position) -> Self {
        let allowed = allowed
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Self::new(
            ViolationKind::DisallowedFunction,
            format!(
                "Function '{}' is allowed with {} argument(s), not {}",
                name, allowed, given
            ),
            position,
        )
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PolicyViolation {}

/// Categories of policy violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    /// A referenced table is not in the catalog.
    TableNotAllowed,
    /// An identifier refers to a system catalog or schema.
    CatalogReference,
    /// A column is unknown, or its qualifier is not in scope.
    ColumnNotAllowed,
    /// A column resolves to more than one table, or a binding is reused.
    AmbiguousColumn,
    /// A join is not witnessed by a declared foreign key.
    JoinNotInSchemaGraph,
    /// A function is not allowed or has the wrong arity.
    DisallowedFunction,
}

impl ViolationKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TableNotAllowed => "TableNotAllowed",
            Self::CatalogReference => "CatalogReference",
            Self::ColumnNotAllowed => "ColumnNotAllowed",
            Self::AmbiguousColumn => "AmbiguousColumn",
            Self::JoinNotInSchemaGraph => "JoinNotInSchemaGraph",
            Self::DisallowedFunction => "DisallowedFunction",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised while building or publishing a schema catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("{what} name must not be empty")]
    EmptyName { what: &'static str },

    #[error("'{0}' is a reserved system name")]
    SystemName(String),

    #[error("table '{0}' is declared more than once")]
    DuplicateTable(String),

    #[error("table '{0}' has no columns")]
    NoColumns(String),

    #[error("column '{column}' is declared more than once on table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("function '{name}' with arity {arity} is declared more than once")]
    DuplicateFunction { name: String, arity: usize },

    #[error("foreign key references unknown table '{0}'")]
    UnknownForeignKeyTable(String),

    #[error("foreign key references unknown column '{table}.{column}'")]
    UnknownForeignKeyColumn { table: String, column: String },

    #[error(
        "foreign key {from_table}.{from_column} ({from_type}) -> {to_table}.{to_column} ({to_type}) has mismatched types"
    )]
    ForeignKeyTypeMismatch {
        from_table: String,
        from_column: String,
        from_type: String,
        to_table: String,
        to_column: String,
        to_type: String,
    },

    #[error("catalog version {proposed} is not newer than the current version {current}")]
    StaleVersion { current: u64, proposed: u64 },
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        "CatalogError"
    }
}
