//! Error types for the audit crate.

use thiserror::Error;

/// Errors that can occur while recording verdicts.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A sink could not be set up from configuration.
    #[error("failed to initialize audit sink: {0}")]
    InitializationFailed(String),

    /// A sink rejected a record.
    #[error("sink error: {0}")]
    SinkError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AuditError {
    /// Stable error code, matching the other SQLGate error families.
    pub fn code(&self) -> &'static str {
        "AuditError"
    }
}
