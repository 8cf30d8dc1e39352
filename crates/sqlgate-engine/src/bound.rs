//! Row and timeout bounds for accepted statements, plus the canonical text.

use sqlgate_core::BoundingConfig;
use sqlgate_policy::CheckedStatement;
use sqlgate_sql::ast::LimitValue;
use sqlgate_sql::parse_sql;

use crate::error::ValidationError;

/// A checked statement with its bounds applied and printed canonically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedStatement {
    pub canonical_sql: String,
    pub row_limit: u64,
    pub timeout_ms: u64,
}

/// Apply the row ceiling and compute the timeout.
///
/// A missing `LIMIT` or `LIMIT ALL` becomes `LIMIT max_rows`; a larger explicit
/// limit is clamped; anything at or below the ceiling is kept. `OFFSET` is kept as is.
/// The printed text must parse back to itself, otherwise the statement is refused.
pub fn bound(
    checked: CheckedStatement,
    config: &BoundingConfig,
    requested_timeout_ms: Option<u64>,
) -> Result<BoundedStatement, ValidationError> {
    let mut statement = checked.into_statement();

    let requested_rows = match statement.limit {
        Some(LimitValue::Count(n)) => Some(n),
        Some(LimitValue::All) | None => None,
    };
    let row_limit = config.row_limit(requested_rows);
    statement.limit = Some(LimitValue::Count(row_limit));

    let timeout_ms = config.timeout_ms(requested_timeout_ms);
    let canonical_sql = statement.to_string();
    verify_canonical(&canonical_sql)?;

    tracing::trace!(row_limit, timeout_ms, "bounded statement");
    Ok(BoundedStatement {
        canonical_sql,
        row_limit,
        timeout_ms,
    })
}

/// Re-lex, re-parse and re-print `canonical`; it must come back unchanged.
fn verify_canonical(canonical: &str) -> Result<(), ValidationError> {
    let reparsed = parse_sql(canonical).map_err(|e| {
        ValidationError::Internal(format!(
            "canonical SQL does not parse ({}): {}",
            e.code(),
            e.detail()
        ))
    })?;

    let reprinted = reparsed.to_string();
    if reprinted != canonical {
        tracing::error!("canonical SQL is not a fixed point");
        return Err(ValidationError::Internal(
            "canonical SQL does not reproduce itself".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlgate_core::SchemaCatalogConfig;
    use sqlgate_policy::{SchemaCatalog, check};

    fn bounded(sql: &str, config: &BoundingConfig, timeout: Option<u64>) -> BoundedStatement {
        let catalog = SchemaCatalog::from_config(
            &SchemaCatalogConfig::default().with_table("seller", &[("id", "integer"), ("name", "text")]),
        )
        .unwrap();
        let checked = check(&parse_sql(sql).unwrap(), &catalog).unwrap();
        bound(checked, config, timeout).unwrap()
    }

    #[test]
    fn test_missing_limit_gets_ceiling() {
        let b = bounded("SELECT id FROM seller", &BoundingConfig::default(), None);
        assert_eq!(b.canonical_sql, "SELECT id FROM seller LIMIT 10000");
        assert_eq!(b.row_limit, 10000);
        assert_eq!(b.timeout_ms, 5000);
    }

    #[test]
    fn test_limit_all_gets_ceiling() {
        let b = bounded("SELECT id FROM seller LIMIT ALL", &BoundingConfig::default(), None);
        assert_eq!(b.canonical_sql, "SELECT id FROM seller LIMIT 10000");
    }

    #[test]
    fn test_large_limit_is_clamped_small_kept() {
        let config = BoundingConfig::default();
        assert_eq!(
            bounded("SELECT id FROM seller LIMIT 100000", &config, None).row_limit,
            10000
        );
        let b = bounded("SELECT id FROM seller LIMIT 5 OFFSET 20", &config, None);
        assert_eq!(b.canonical_sql, "SELECT id FROM seller LIMIT 5 OFFSET 20");
        assert_eq!(b.row_limit, 5);

        let zero = bounded("SELECT id FROM seller LIMIT 0", &config, None);
        assert_eq!(zero.row_limit, 0);
        assert_eq!(zero.canonical_sql, "SELECT id FROM seller LIMIT 0");
    }

    #[test]
    fn test_offset_before_limit_is_reordered() {
        let b = bounded(
            "SELECT id FROM seller OFFSET 3 LIMIT 7",
            &BoundingConfig::default(),
            None,
        );
        assert_eq!(b.canonical_sql, "SELECT id FROM seller LIMIT 7 OFFSET 3");
    }

    #[test]
    fn test_requested_timeout_is_capped() {
        let config = BoundingConfig::default();
        assert_eq!(bounded("SELECT 1", &config, Some(1000)).timeout_ms, 1000);
        assert_eq!(bounded("SELECT 1", &config, Some(999_999)).timeout_ms, 30000);
    }

    #[test]
    fn test_verify_canonical_rejects_unstable_text() {
        assert!(verify_canonical("SELECT id FROM seller LIMIT 1").is_ok());
        // Not in canonical form: the keyword case differs after re-printing.
        let err = verify_canonical("select id from seller").unwrap_err();
        assert_eq!(err.code(), "InternalError");
        let err = verify_canonical("SELECT id FROM").unwrap_err();
        assert_eq!(err.code(), "InternalError");
    }
}
