#![allow(dead_code)]

use sqlgate_core::{BoundingConfig, SchemaCatalogConfig};
use sqlgate_engine::{GeneratedCandidate, ValidationVerdict, validate};
use sqlgate_policy::SchemaCatalog;

/// The sample order-management catalog shipped in `config/`.
pub fn catalog() -> SchemaCatalog {
    let config = SchemaCatalogConfig::from_yaml(include_str!("../../../../config/catalog.yaml"))
        .expect("sample catalog must parse");
    SchemaCatalog::from_config(&config).expect("sample catalog must be valid")
}

pub fn bounding() -> BoundingConfig {
    BoundingConfig {
        max_rows: 10000,
        default_timeout_ms: 5000,
        max_timeout_ms: 30000,
    }
}

pub fn check(sql: &str) -> ValidationVerdict {
    validate(&GeneratedCandidate::new(sql), &catalog(), &bounding())
}

pub fn accepted_sql(sql: &str) -> String {
    match check(sql) {
        ValidationVerdict::Accepted { canonical_sql, .. } => canonical_sql,
        other => panic!("expected {:?} to be accepted, got {:?}", sql, other),
    }
}

pub fn rejected_code(sql: &str) -> String {
    match check(sql) {
        ValidationVerdict::Rejected { code, .. } => code,
        other => panic!("expected {:?} to be rejected, got {:?}", sql, other),
    }
}
