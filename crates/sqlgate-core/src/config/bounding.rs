//! Row limit and timeout bounds applied to accepted queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bounds attached to every accepted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingConfig {
    /// Ceiling for `LIMIT`. Injected when a query has none.
    #[serde(default = "default_max_rows")]
    pub max_rows: u64,

    /// Statement timeout used when the caller does not request one.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Ceiling for any requested statement timeout.
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
}

impl Default for BoundingConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            default_timeout_ms: default_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
        }
    }
}

/// A bounding configuration that cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundingError {
    #[error("maxRows must be greater than zero")]
    ZeroMaxRows,

    #[error("maxTimeoutMs must be greater than zero")]
    ZeroMaxTimeout,

    #[error("defaultTimeoutMs ({default}) exceeds maxTimeoutMs ({max})")]
    DefaultTimeoutAboveMax { default: u64, max: u64 },
}

impl BoundingError {
    /// Stable rejection code.
    pub fn code(&self) -> &'static str {
        "BoundingError"
    }
}

impl BoundingConfig {
    /// Check the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), BoundingError> {
        if self.max_rows == 0 {
            return Err(BoundingError::ZeroMaxRows);
        }
        if self.max_timeout_ms == 0 {
            return Err(BoundingError::ZeroMaxTimeout);
        }
        if self.default_timeout_ms > self.max_timeout_ms {
            return Err(BoundingError::DefaultTimeoutAboveMax {
                default: self.default_timeout_ms,
                max: self.max_timeout_ms,
            });
        }
        Ok(())
    }

    /// Row limit for a query that asked for `requested` rows (`None` = no LIMIT).
    pub fn row_limit(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(n) => n.min(self.max_rows),
            None => self.max_rows,
        }
    }

    /// Timeout for a caller that asked for `requested` milliseconds.
    pub fn timeout_ms(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_timeout_ms)
            .min(self.max_timeout_ms)
    }
}

fn default_max_rows() -> u64 {
    10000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_timeout_ms() -> u64 {
    30000
}
