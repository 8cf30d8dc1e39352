//! The audit recorder.

use std::sync::Arc;
use std::time::Duration;

use sqlgate_core::AuditConfig;

use crate::error::AuditError;
use crate::record::{AuditOutcome, AuditRecord};
use crate::sink::{AuditSink, ConsoleSink, NullSink, create_sink};

/// Emits one record per validation request to the configured sink.
///
/// Recording never fails from the caller's point of view: sink errors are logged
/// and swallowed so they cannot change a verdict, and a write that outlasts
/// `write_timeout_ms` is abandoned.
#[derive(Clone)]
pub struct AuditRecorder {
    config: AuditConfig,
    sink: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuditRecorder {
    /// Create a recorder with the sink described by `config`.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        let sink: Arc<dyn AuditSink> = Arc::from(create_sink(&config)?);
        Ok(Self { config, sink })
    }

    /// Create a recorder with a custom sink.
    pub fn with_sink(config: AuditConfig, sink: Arc<dyn AuditSink>) -> Self {
        Self { config, sink }
    }

    /// Create a disabled (no-op) recorder.
    pub fn disabled() -> Self {
        Self {
            config: AuditConfig {
                enabled: false,
                ..Default::default()
            },
            sink: Arc::new(NullSink),
        }
    }

    /// Create a console-only recorder.
    pub fn console_only() -> Self {
        Self {
            config: AuditConfig {
                enabled: true,
                stdout: true,
                ..Default::default()
            },
            sink: Arc::new(ConsoleSink),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Write a record. SQL text is stripped unless the configuration includes it,
    /// and only accepted records ever carry it.
    pub async fn record(&self, mut record: AuditRecord) {
        if !self.config.enabled {
            return;
        }
        if !self.config.include_sql || record.outcome == AuditOutcome::Rejected {
            record.sql = None;
        }

        let limit = Duration::from_millis(self.config.write_timeout_ms);
        match tokio::time::timeout(limit, self.sink.write(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                error = %e,
                correlation_id = %record.correlation_id,
                record_id = %record.record_id,
                "Failed to write audit record"
            ),
            Err(_) => tracing::warn!(
                timeout_ms = self.config.write_timeout_ms,
                correlation_id = %record.correlation_id,
                record_id = %record.record_id,
                "Audit sink timed out, record dropped"
            ),
        }
    }
}
