//! Long-lived gate service: current catalog, bounds and audit recorder.

use std::sync::Arc;
use std::time::Instant;

use sqlgate_audit::{AuditOutcome, AuditRecord, AuditRecorder};
use sqlgate_core::{BoundingConfig, GateConfig, SchemaCatalogConfig};
use sqlgate_policy::{CatalogError, CatalogStore, SchemaCatalog};

use crate::candidate::GeneratedCandidate;
use crate::error::GateError;
use crate::validate::validate_with_timeout;
use crate::verdict::ValidationVerdict;

/// Validates candidates against the current catalog and records every verdict.
///
/// Validation itself is synchronous; only [`Gate::process`] awaits, and only after
/// the verdict is final.
#[derive(Debug)]
pub struct Gate {
    catalogs: CatalogStore,
    bounding: BoundingConfig,
    recorder: AuditRecorder,
}

impl Gate {
    pub fn new(catalog: SchemaCatalog, bounding: BoundingConfig, recorder: AuditRecorder) -> Self {
        Self {
            catalogs: CatalogStore::new(catalog),
            bounding,
            recorder,
        }
    }

    /// Build a gate from loaded configuration.
    ///
    /// The bounding configuration is checked here as well as on every request, so
    /// a broken file fails at startup.
    pub fn from_config(config: &GateConfig) -> Result<Self, GateError> {
        let catalog = SchemaCatalog::from_config(config.require_catalog()?)?;
        config.bounding.validate()?;
        let recorder = AuditRecorder::new(config.audit.clone())?;

        tracing::info!(
            version = catalog.version(),
            tables = catalog.table_count(),
            functions = catalog.function_count(),
            max_rows = config.bounding.max_rows,
            "Gate initialized"
        );
        Ok(Self::new(catalog, config.bounding, recorder))
    }

    /// Current catalog snapshot.
    pub fn catalog(&self) -> Arc<SchemaCatalog> {
        self.catalogs.snapshot()
    }

    pub fn catalog_version(&self) -> u64 {
        self.catalogs.version()
    }

    pub fn bounding(&self) -> &BoundingConfig {
        &self.bounding
    }

    /// Validate without recording.
    pub fn validate(&self, candidate: &GeneratedCandidate) -> ValidationVerdict {
        let catalog = self.catalogs.snapshot();
        validate_with_timeout(candidate, &catalog, &self.bounding, None)
    }

    /// Validate, then record the verdict. Recording cannot change the verdict, and a
    /// stalled sink delays it by at most the audit write timeout.
    pub async fn process(
        &self,
        candidate: &GeneratedCandidate,
        requested_timeout_ms: Option<u64>,
    ) -> ValidationVerdict {
        let started = Instant::now();
        let catalog = self.catalogs.snapshot();
        let verdict =
            validate_with_timeout(candidate, &catalog, &self.bounding, requested_timeout_ms);
        let latency = started.elapsed();

        let builder = match &verdict {
            ValidationVerdict::Accepted {
                canonical_sql,
                row_limit,
                timeout_ms,
            } => AuditRecord::builder(
                candidate.correlation_id.as_str(),
                AuditOutcome::Accepted,
                canonical_sql,
            )
            .bounds(*row_limit, *timeout_ms)
            .sql(canonical_sql.as_str()),
            ValidationVerdict::Rejected { code, .. } => AuditRecord::builder(
                candidate.correlation_id.as_str(),
                AuditOutcome::Rejected,
                &candidate.text,
            )
            .code(code.as_str()),
        };
        let mut builder = builder.catalog_version(catalog.version()).latency(latency);
        if let Some(model) = &candidate.model_identifier {
            builder = builder.model_identifier(model.as_str());
        }

        self.recorder.record(builder.build()).await;
        verdict
    }

    /// Build and publish a new catalog version. Returns the version now in effect.
    ///
    /// In-flight validations keep the snapshot they started with.
    pub fn reload(&self, config: &SchemaCatalogConfig) -> Result<u64, CatalogError> {
        let catalog = SchemaCatalog::from_config(config)?;
        let version = catalog.version();
        self.catalogs.publish(catalog)?;
        Ok(version)
    }
}
