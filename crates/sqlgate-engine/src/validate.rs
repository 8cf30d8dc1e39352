//! The synchronous validation pipeline.
//!
//! `Received -> Tokenized -> Parsed -> PolicyChecked -> Accepted | Rejected`.
//! Any failure moves straight to `Rejected`; nothing is retried.

use sqlgate_core::BoundingConfig;
use sqlgate_policy::{SchemaCatalog, check};
use sqlgate_sql::{parse, tokenize};

use crate::bound::{BoundedStatement, bound};
use crate::candidate::GeneratedCandidate;
use crate::error::ValidationError;
use crate::verdict::ValidationVerdict;

/// Validate a candidate with the default statement timeout.
pub fn validate(
    candidate: &GeneratedCandidate,
    catalog: &SchemaCatalog,
    config: &BoundingConfig,
) -> ValidationVerdict {
    validate_with_timeout(candidate, catalog, config, None)
}

/// Validate a candidate, capping `requested_timeout_ms` at the configured maximum.
pub fn validate_with_timeout(
    candidate: &GeneratedCandidate,
    catalog: &SchemaCatalog,
    config: &BoundingConfig,
    requested_timeout_ms: Option<u64>,
) -> ValidationVerdict {
    match run(candidate, catalog, config, requested_timeout_ms) {
        Ok(bounded) => {
            tracing::debug!(
                correlation_id = %candidate.correlation_id,
                catalog_version = catalog.version(),
                row_limit = bounded.row_limit,
                timeout_ms = bounded.timeout_ms,
                "Candidate accepted"
            );
            bounded.into()
        }
        Err(e) => {
            tracing::warn!(
                correlation_id = %candidate.correlation_id,
                catalog_version = catalog.version(),
                code = e.code(),
                "Candidate rejected"
            );
            e.into()
        }
    }
}

fn run(
    candidate: &GeneratedCandidate,
    catalog: &SchemaCatalog,
    config: &BoundingConfig,
    requested_timeout_ms: Option<u64>,
) -> Result<BoundedStatement, ValidationError> {
    config.validate()?;

    tracing::debug!(correlation_id = %candidate.correlation_id, sql = %candidate.text, "Received candidate");
    let tokens = tokenize(&candidate.text).map_err(sqlgate_sql::SqlError::from)?;
    tracing::debug!(tokens = tokens.len(), "Tokenized");

    let statement = parse(tokens).map_err(sqlgate_sql::SqlError::from)?;
    tracing::debug!("Parsed");

    let checked = check(&statement, catalog)?;
    tracing::debug!(tables = ?checked.tables(), "Policy checked");

    bound(checked, config, requested_timeout_ms)
}
