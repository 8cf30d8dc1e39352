//! Immutable, versioned schema catalog.
//!
//! A [`SchemaCatalog`] is built once from a [`SchemaCatalogConfig`] and never
//! mutated afterwards. Construction checks the invariants the policy engine relies
//! on: names are unique and non-empty, nothing shadows a system name, and every
//! foreign-key edge points at columns of the same catalog with matching types.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sqlgate_core::SchemaCatalogConfig;

use crate::error::CatalogError;
use crate::system::is_system_name;

/// A column of a catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

/// A catalog table. Columns keep their declared order, which is the order `*`
/// expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// A declared foreign key, usable as a join path in either direction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ForeignKeyEdge {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl ForeignKeyEdge {
    /// True if this edge links `a_table.a_column` and `b_table.b_column`, in
    /// either direction.
    pub fn connects(&self, a_table: &str, a_column: &str, b_table: &str, b_column: &str) -> bool {
        let forward = self.from_table == a_table
            && self.from_column == a_column
            && self.to_table == b_table
            && self.to_column == b_column;
        let backward = self.from_table == b_table
            && self.from_column == b_column
            && self.to_table == a_table
            && self.to_column == a_column;
        forward || backward
    }
}

/// The allow-listed view of the database a query may touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaCatalog {
    version: u64,
    tables: BTreeMap<String, Table>,
    foreign_keys: Vec<ForeignKeyEdge>,
    functions: BTreeMap<String, BTreeSet<usize>>,
}

impl SchemaCatalog {
    /// Build a catalog from its configuration, checking every construction invariant.
    pub fn from_config(config: &SchemaCatalogConfig) -> Result<Self, CatalogError> {
        let mut tables = BTreeMap::new();
        for table_config in &config.tables {
            let table_name = normalize_name(&table_config.name, "table")?;
            if tables.contains_key(&table_name) {
                return Err(CatalogError::DuplicateTable(table_name));
            }
            if table_config.columns.is_empty() {
                return Err(CatalogError::NoColumns(table_name));
            }

            let mut columns: Vec<Column> = Vec::with_capacity(table_config.columns.len());
            for column_config in &table_config.columns {
                let column_name = normalize_name(&column_config.name, "column")?;
                if columns.iter().any(|c| c.name == column_name) {
                    return Err(CatalogError::DuplicateColumn {
                        table: table_name,
                        column: column_name,
                    });
                }
                columns.push(Column {
                    name: column_name,
                    data_type: column_config.data_type.trim().to_ascii_lowercase(),
                });
            }

            tables.insert(
                table_name.clone(),
                Table {
                    name: table_name,
                    columns,
                },
            );
        }

        let mut foreign_keys = Vec::with_capacity(config.foreign_keys.len());
        for fk in &config.foreign_keys {
            let edge = ForeignKeyEdge {
                from_table: fk.from_table.trim().to_lowercase(),
                from_column: fk.from_column.trim().to_lowercase(),
                to_table: fk.to_table.trim().to_lowercase(),
                to_column: fk.to_column.trim().to_lowercase(),
            };
            let from_type = column_type(&tables, &edge.from_table, &edge.from_column)?;
            let to_type = column_type(&tables, &edge.to_table, &edge.to_column)?;
            if from_type != to_type {
                return Err(CatalogError::ForeignKeyTypeMismatch {
                    from_table: edge.from_table,
                    from_column: edge.from_column,
                    from_type: from_type.to_string(),
                    to_table: edge.to_table,
                    to_column: edge.to_column,
                    to_type: to_type.to_string(),
                });
            }
            if !foreign_keys.contains(&edge) {
                foreign_keys.push(edge);
            }
        }

        let mut functions: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        for function in &config.allowed_functions {
            let name = normalize_name(&function.name, "function")?;
            let arities = functions.entry(name.clone()).or_default();
            if !arities.insert(function.arity) {
                return Err(CatalogError::DuplicateFunction {
                    name,
                    arity: function.arity,
                });
            }
        }

        tracing::debug!(
            version = config.version,
            tables = tables.len(),
            foreign_keys = foreign_keys.len(),
            functions = functions.len(),
            "Built schema catalog"
        );

        Ok(Self {
            version: config.version,
            tables,
            foreign_keys,
            functions,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn foreign_keys(&self) -> &[ForeignKeyEdge] {
        &self.foreign_keys
    }

    /// True if some declared edge links the two columns, in either direction.
    pub fn has_foreign_key(
        &self,
        a_table: &str,
        a_column: &str,
        b_table: &str,
        b_column: &str,
    ) -> bool {
        self.foreign_keys
            .iter()
            .any(|edge| edge.connects(a_table, a_column, b_table, b_column))
    }

    /// Arities the named function is allowed with, or `None` if it is not allowed at all.
    pub fn function_arities(&self, name: &str) -> Option<&BTreeSet<usize>> {
        self.functions.get(name)
    }

    pub fn allows_function(&self, name: &str, arity: usize) -> bool {
        self.functions
            .get(name)
            .is_some_and(|arities| arities.contains(&arity))
    }

    pub fn function_count(&self) -> usize {
        self.functions.values().map(|a| a.len()).sum()
    }
}

/// Trim and lower-case a configured name, rejecting empty and system names.
fn normalize_name(raw: &str, what: &'static str) -> Result<String, CatalogError> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
        return Err(CatalogError::EmptyName { what });
    }
    if is_system_name(&name) {
        return Err(CatalogError::SystemName(name));
    }
    Ok(name)
}

fn column_type<'a>(
    tables: &'a BTreeMap<String, Table>,
    table: &str,
    column: &str,
) -> Result<&'a str, CatalogError> {
    let table_def = tables
        .get(table)
        .ok_or_else(|| CatalogError::UnknownForeignKeyTable(table.to_string()))?;
    table_def
        .column(column)
        .map(|c| c.data_type.as_str())
        .ok_or_else(|| CatalogError::UnknownForeignKeyColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_config() -> SchemaCatalogConfig {
        SchemaCatalogConfig {
            version: 1,
            ..Default::default()
        }
        .with_table("seller", &[("id", "integer"), ("name", "text")])
        .with_table(
            "customer",
            &[("id", "integer"), ("name", "text"), ("seller_id", "integer")],
        )
        .with_foreign_key("customer", "seller_id", "seller", "id")
        .with_function("count", 1)
        .with_function("round", 1)
        .with_function("round", 2)
    }

    #[test]
    fn test_builds_valid_catalog() {
        let catalog = SchemaCatalog::from_config(&base_config()).unwrap();
        assert_eq!(catalog.version(), 1);
        assert_eq!(catalog.table_count(), 2);
        assert!(catalog.table("seller").unwrap().has_column("name"));
        assert!(catalog.has_foreign_key("seller", "id", "customer", "seller_id"));
        assert!(catalog.has_foreign_key("customer", "seller_id", "seller", "id"));
        assert!(!catalog.has_foreign_key("seller", "id", "customer", "id"));
        assert!(catalog.allows_function("round", 2));
        assert!(!catalog.allows_function("round", 3));
        assert_eq!(catalog.function_count(), 3);
    }

    #[test]
    fn test_names_are_normalized() {
        let config = SchemaCatalogConfig::default()
            .with_table(" Seller ", &[("ID", "INTEGER")])
            .with_function("COUNT", 1);
        let catalog = SchemaCatalog::from_config(&config).unwrap();
        let seller = catalog.table("seller").unwrap();
        assert_eq!(seller.columns[0].name, "id");
        assert_eq!(seller.columns[0].data_type, "integer");
        assert!(catalog.allows_function("count", 1));
    }

    #[test]
    fn test_rejects_duplicates() {
        let config = base_config().with_table("SELLER", &[("id", "integer")]);
        assert_eq!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::DuplicateTable("seller".into())
        );

        let config = SchemaCatalogConfig::default()
            .with_table("t", &[("a", "integer"), ("A", "integer")]);
        assert!(matches!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::DuplicateColumn { .. }
        ));

        let config = base_config().with_function("count", 1);
        assert!(matches!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::DuplicateFunction { .. }
        ));
    }

    #[test]
    fn test_rejects_empty_and_system_names() {
        let config = SchemaCatalogConfig::default().with_table("", &[("id", "integer")]);
        assert!(matches!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::EmptyName { what: "table" }
        ));

        let config = SchemaCatalogConfig::default().with_table("pg_roles", &[("id", "integer")]);
        assert_eq!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::SystemName("pg_roles".into())
        );

        let config = SchemaCatalogConfig::default().with_table("t", &[]);
        assert_eq!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::NoColumns("t".into())
        );
    }

    #[test]
    fn test_rejects_dangling_foreign_keys() {
        let config = base_config().with_foreign_key("customer", "seller_id", "vendor", "id");
        assert_eq!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::UnknownForeignKeyTable("vendor".into())
        );

        let config = base_config().with_foreign_key("customer", "vendor_id", "seller", "id");
        assert!(matches!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::UnknownForeignKeyColumn { .. }
        ));
    }

    #[test]
    fn test_rejects_foreign_key_type_mismatch() {
        let config = base_config().with_foreign_key("customer", "name", "seller", "id");
        assert!(matches!(
            SchemaCatalog::from_config(&config).unwrap_err(),
            CatalogError::ForeignKeyTypeMismatch { .. }
        ));
    }
}
