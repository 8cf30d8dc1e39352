//! Audit record types.
//!
//! One record is emitted per validation request. The query text is always hashed;
//! the text itself is only carried when the recorder is configured to include it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Final outcome of a validation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Accepted,
    Rejected,
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// An audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID.
    pub record_id: Uuid,

    /// When the verdict was recorded.
    pub occurred_at: DateTime<Utc>,

    /// Caller-supplied identifier tying the record to a request.
    pub correlation_id: String,

    /// Model that produced the candidate, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_identifier: Option<String>,

    /// Catalog version the candidate was checked against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_version: Option<u64>,

    /// SHA-256 hex of the canonical SQL (accepted) or the raw candidate (rejected).
    pub sql_hash: String,

    pub outcome: AuditOutcome,

    /// Rejection code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Validation latency in microseconds.
    pub latency_us: u64,

    /// Canonical SQL text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl AuditRecord {
    /// Create a record for `text`, which is hashed immediately.
    pub fn new(correlation_id: impl Into<String>, outcome: AuditOutcome, text: &str) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            correlation_id: correlation_id.into(),
            model_identifier: None,
            catalog_version: None,
            sql_hash: sql_hash(text),
            outcome,
            code: None,
            row_limit: None,
            timeout_ms: None,
            latency_us: 0,
            sql: None,
        }
    }

    pub fn builder(
        correlation_id: impl Into<String>,
        outcome: AuditOutcome,
        text: &str,
    ) -> AuditRecordBuilder {
        AuditRecordBuilder::new(correlation_id, outcome, text)
    }

    /// Format as a single human-readable line.
    /// Format: [outcome - correlation - hash] code/limits
    pub fn to_log_line(&self) -> String {
        let detail = match self.outcome {
            AuditOutcome::Accepted => format!(
                "rows={} timeout={}ms",
                self.row_limit.unwrap_or_default(),
                self.timeout_ms.unwrap_or_default()
            ),
            AuditOutcome::Rejected => self.code.clone().unwrap_or_else(|| "-".to_string()),
        };
        format!(
            "[{}] [{} - {} - {}] {} ({}us)",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.outcome,
            self.correlation_id,
            &self.sql_hash[..12.min(self.sql_hash.len())],
            detail,
            self.latency_us
        )
    }
}

/// Builder for audit records.
pub struct AuditRecordBuilder {
    record: AuditRecord,
}

impl AuditRecordBuilder {
    pub fn new(correlation_id: impl Into<String>, outcome: AuditOutcome, text: &str) -> Self {
        Self {
            record: AuditRecord::new(correlation_id, outcome, text),
        }
    }

    pub fn model_identifier(mut self, model: impl Into<String>) -> Self {
        self.record.model_identifier = Some(model.into());
        self
    }

    pub fn catalog_version(mut self, version: u64) -> Self {
        self.record.catalog_version = Some(version);
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.record.code = Some(code.into());
        self
    }

    /// Set the row limit and timeout of an accepted statement.
    pub fn bounds(mut self, row_limit: u64, timeout_ms: u64) -> Self {
        self.record.row_limit = Some(row_limit);
        self.record.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.record.latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.record.sql = Some(sql.into());
        self
    }

    pub fn build(self) -> AuditRecord {
        self.record
    }
}

/// Lowercase hex SHA-256 of `text`.
pub fn sql_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
