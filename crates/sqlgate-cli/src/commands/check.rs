//! `sqlgate check` command implementation.
//!
//! Checks a catalog file before it is handed to a running gate:
//! - JSON Schema validation against the embedded `SchemaCatalog` schema
//! - Catalog construction (duplicates, system names, foreign-key consistency)
//! - Warnings for tables that cannot take part in any join

use anyhow::Result;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sqlgate_core::SchemaCatalogConfig;
use sqlgate_policy::SchemaCatalog;

/// Embedded so validation works without the repository checked out.
const SCHEMA_CATALOG_SCHEMA: &str =
    include_str!("../../../../schemas/SchemaCatalog.schema.json");

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: &'static str,
    pub message: String,
    /// Location within the file (e.g. "/tables/0/columns").
    pub location: Option<String>,
}

impl CheckFinding {
    fn error(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            message: message.into(),
            location: None,
        }
    }

    fn warning(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(category, message)
        }
    }

    fn info(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::error(category, message)
        }
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Results from running all checks on one file.
#[derive(Debug)]
pub struct CheckResults {
    pub file: PathBuf,
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        println!("Checked {}", self.file.display());
        println!("{}", "-".repeat(60));

        let mut findings: Vec<_> = self.findings.iter().collect();
        // Most severe first, stable within a severity.
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        for finding in findings {
            let location = finding
                .location
                .as_ref()
                .map(|l| format!(" [{}]", l))
                .unwrap_or_default();
            println!(
                "  {:<5} [{}]{}: {}",
                finding.severity, finding.category, location, finding.message
            );
        }

        println!("{}", "=".repeat(60));
        let errors = self.count(Severity::Error);
        let warnings = self.count(Severity::Warning);
        if errors == 0 && warnings == 0 {
            println!("All checks passed.");
        } else {
            println!("Summary: {} error(s), {} warning(s)", errors, warnings);
        }
    }
}

// ============================================================================
// Main Check Runner
// ============================================================================

/// Run `sqlgate check`. Exit code 1 when the catalog has errors.
pub fn run(catalog_path: &Path) -> Result<ExitCode> {
    let results = check_catalog(catalog_path)?;
    results.print_summary();
    if results.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Run all checks without printing.
pub fn check_catalog(catalog_path: &Path) -> Result<CheckResults> {
    let mut results = CheckResults {
        file: catalog_path.to_path_buf(),
        findings: Vec::new(),
    };

    // 1. JSON Schema validation
    let schema_findings = validate_against_schema(catalog_path)?;
    let schema_ok = schema_findings.is_empty();
    results.findings.extend(schema_findings);
    if !schema_ok {
        return Ok(results);
    }

    // 2. Catalog construction
    let config = match SchemaCatalogConfig::from_file(catalog_path) {
        Ok(config) => config,
        Err(e) => {
            results.findings.push(CheckFinding::error("load", e.to_string()));
            return Ok(results);
        }
    };
    let catalog = match SchemaCatalog::from_config(&config) {
        Ok(catalog) => catalog,
        Err(e) => {
            results
                .findings
                .push(CheckFinding::error("catalog", e.to_string()).with_location(e.code()));
            return Ok(results);
        }
    };

    // 3. Join graph reachability
    results.findings.extend(check_isolated_tables(&catalog));

    results.findings.push(CheckFinding::info(
        "summary",
        format!(
            "version {}: {} table(s), {} foreign key(s), {} function(s)",
            catalog.version(),
            catalog.table_count(),
            catalog.foreign_keys().len(),
            catalog.function_count()
        ),
    ));
    Ok(results)
}

// ============================================================================
// Check 1: JSON Schema
// ============================================================================

fn validate_against_schema(path: &Path) -> Result<Vec<CheckFinding>> {
    let mut findings = Vec::new();

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            findings.push(CheckFinding::error(
                "json-schema",
                format!("Failed to read file: {}", e),
            ));
            return Ok(findings);
        }
    };

    // YAML is a superset of JSON, so one parser covers both formats.
    let instance: JsonValue = match serde_yaml::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            findings.push(CheckFinding::error(
                "json-schema",
                format!("Failed to parse file: {}", e),
            ));
            return Ok(findings);
        }
    };

    let schema: JsonValue = serde_json::from_str(SCHEMA_CATALOG_SCHEMA)?;
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            findings.push(CheckFinding::error(
                "json-schema",
                format!("Failed to compile JSON schema: {}", e),
            ));
            return Ok(findings);
        }
    };

    for error in validator.iter_errors(&instance) {
        let path_str = error.instance_path().to_string();
        let location = if path_str.is_empty() {
            "(root)".to_string()
        } else {
            path_str
        };
        findings.push(CheckFinding::error("json-schema", error.to_string()).with_location(location));
    }

    Ok(findings)
}

// ============================================================================
// Check 3: Isolated Tables
// ============================================================================

fn check_isolated_tables(catalog: &SchemaCatalog) -> Vec<CheckFinding> {
    if catalog.table_count() < 2 {
        return Vec::new();
    }
    catalog
        .tables()
        .filter(|table| {
            !catalog
                .foreign_keys()
                .iter()
                .any(|fk| fk.from_table == table.name || fk.to_table == table.name)
        })
        .map(|table| {
            CheckFinding::warning(
                "join-graph",
                format!(
                    "Table '{}' has no foreign-key edges and can only be queried on its own",
                    table.name
                ),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_sample_catalog_passes() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/catalog.yaml");
        let results = check_catalog(&path).unwrap();
        assert!(!results.has_errors(), "{:?}", results.findings);
        assert_eq!(results.count(Severity::Warning), 0);
        assert_eq!(results.count(Severity::Info), 1);
    }

    #[test]
    fn test_schema_violation_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.yaml", "tables: []\n");
        let results = check_catalog(&path).unwrap();
        assert!(results.has_errors());
        assert_eq!(results.findings[0].category, "json-schema");
    }

    #[test]
    fn test_catalog_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "dup.json",
            r#"{"version": 1, "tables": [
                {"name": "seller", "columns": [{"name": "id", "type": "integer"}]},
                {"name": "seller", "columns": [{"name": "id", "type": "integer"}]}
            ]}"#,
        );
        let results = check_catalog(&path).unwrap();
        assert!(results.has_errors());
        assert_eq!(results.findings[0].category, "catalog");
    }

    #[test]
    fn test_isolated_table_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "catalog.yaml",
            "version: 1\ntables:\n  - name: a\n    columns: [{ name: id, type: integer }]\n  - name: b\n    columns: [{ name: id, type: integer }]\n",
        );
        let results = check_catalog(&path).unwrap();
        assert!(!results.has_errors());
        assert_eq!(results.count(Severity::Warning), 2);
    }
}
