//! Detection of system schema and catalog names.

/// Schemas that expose database internals.
pub const SYSTEM_SCHEMAS: &[&str] = &[
    "pg_catalog",
    "information_schema",
    "pg_toast",
    "mysql",
    "performance_schema",
    "sys",
];

/// Name prefixes reserved for system relations and functions.
pub const SYSTEM_PREFIXES: &[&str] = &["pg_", "sqlite_"];

/// Check if a name refers to a system schema, relation or function.
///
/// Matching ignores case, so quoted spellings like `"PG_CATALOG"` are caught too.
pub fn is_system_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SYSTEM_SCHEMAS.contains(&lower.as_str())
        || SYSTEM_PREFIXES
            .iter()
            .any(|prefix| lower.starts_with(prefix))
}
