//! Error types for the validation pipeline and the gate service.

use sqlgate_audit::AuditError;
use sqlgate_core::{BoundingError, ConfigError, Position};
use sqlgate_policy::{CatalogError, PolicyViolation};
use sqlgate_sql::SqlError;
use thiserror::Error;

/// Why a candidate was rejected. Every variant becomes `Rejected{code, message, position?}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Sql(#[from] SqlError),

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error("bounding configuration is invalid: {0}")]
    Bounding(#[from] BoundingError),

    /// Our own configuration or canonicalization is broken.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sql(e) => e.code(),
            Self::Policy(e) => e.code(),
            Self::Bounding(e) => e.code(),
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Sql(e) => e.detail().to_string(),
            Self::Policy(e) => e.message.clone(),
            Self::Bounding(e) => e.to_string(),
            Self::Internal(msg) => msg.clone(),
        }
    }

    /// Position in the candidate text, for errors tied to one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Sql(e) => Some(e.position()),
            Self::Policy(e) => Some(e.position),
            Self::Bounding(_) | Self::Internal(_) => None,
        }
    }
}

/// Errors building or reloading a [`Gate`](crate::Gate).
#[derive(Debug, Error)]
pub enum GateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("bounding error: {0}")]
    Bounding(#[from] BoundingError),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}
