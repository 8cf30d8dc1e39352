//! The answer returned for every candidate.

use serde::{Deserialize, Serialize};
use sqlgate_core::Position;

use crate::bound::BoundedStatement;
use crate::error::ValidationError;

/// Result of validating one candidate.
///
/// Serialized as JSON tagged by `outcome`:
///
/// ```json
/// {"outcome":"accepted","canonicalSql":"SELECT id FROM seller LIMIT 10000","rowLimit":10000,"timeoutMs":5000}
/// {"outcome":"rejected","code":"TableNotAllowed","message":"...","position":{"line":1,"column":16}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ValidationVerdict {
    Accepted {
        canonical_sql: String,
        row_limit: u64,
        timeout_ms: u64,
    },
    Rejected {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
    },
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Rejection code, `None` when accepted.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { code, .. } => Some(code),
        }
    }

    pub fn canonical_sql(&self) -> Option<&str> {
        match self {
            Self::Accepted { canonical_sql, .. } => Some(canonical_sql),
            Self::Rejected { .. } => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<BoundedStatement> for ValidationVerdict {
    fn from(bounded: BoundedStatement) -> Self {
        Self::Accepted {
            canonical_sql: bounded.canonical_sql,
            row_limit: bounded.row_limit,
            timeout_ms: bounded.timeout_ms,
        }
    }
}

impl From<ValidationError> for ValidationVerdict {
    fn from(error: ValidationError) -> Self {
        Self::Rejected {
            code: error.code().to_string(),
            message: error.message(),
            position: error.position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accepted_wire_shape() {
        let verdict = ValidationVerdict::Accepted {
            canonical_sql: "SELECT 1 LIMIT 10".to_string(),
            row_limit: 10,
            timeout_ms: 5000,
        };
        assert_eq!(
            serde_json::to_value(&verdict).unwrap(),
            serde_json::json!({
                "outcome": "accepted",
                "canonicalSql": "SELECT 1 LIMIT 10",
                "rowLimit": 10,
                "timeoutMs": 5000
            })
        );
    }

    #[test]
    fn test_rejected_wire_shape() {
        let verdict = ValidationVerdict::Rejected {
            code: "IllegalComment".to_string(),
            message: "comments are not allowed".to_string(),
            position: Some(Position::new(1, 10)),
        };
        assert_eq!(
            serde_json::to_value(&verdict).unwrap(),
            serde_json::json!({
                "outcome": "rejected",
                "code": "IllegalComment",
                "message": "comments are not allowed",
                "position": {"line": 1, "column": 10}
            })
        );

        let internal: ValidationVerdict =
            ValidationError::Internal("canonical form is unstable".to_string()).into();
        let json = serde_json::to_value(&internal).unwrap();
        assert_eq!(json["code"], "InternalError");
        assert!(json.get("position").is_none());
    }

    #[test]
    fn test_round_trips_through_json() {
        let verdict = ValidationVerdict::Rejected {
            code: "NestedQuery".to_string(),
            message: "subqueries are not allowed".to_string(),
            position: None,
        };
        let back: ValidationVerdict = serde_json::from_str(&verdict.to_json().unwrap()).unwrap();
        assert_eq!(back, verdict);
    }
}
