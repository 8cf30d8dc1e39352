//! `sqlgate validate` command implementation.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::ExitCode;

use sqlgate_core::{GateConfig, SchemaCatalogConfig};
use sqlgate_engine::{Gate, GeneratedCandidate};

use super::read_sql;

/// Exit code for a rejected candidate. 1 is left for usage and configuration errors.
const REJECTED: u8 = 2;

#[derive(Debug)]
pub struct ValidateArgs {
    pub catalog: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub model: Option<String>,
    pub correlation_id: Option<String>,
    pub timeout_ms: Option<u64>,
    pub sql: String,
}

/// Validate one candidate through a fully configured gate and print the verdict JSON.
pub async fn run(args: ValidateArgs) -> Result<ExitCode> {
    let config = load_config(&args)?;
    let gate = Gate::from_config(&config).context("Failed to initialize gate")?;
    tracing::debug!(catalog_version = gate.catalog_version(), "Gate ready");

    let mut candidate = GeneratedCandidate::new(read_sql(&args.sql)?);
    if let Some(id) = args.correlation_id {
        candidate = candidate.with_correlation_id(id);
    }
    if let Some(model) = args.model {
        candidate = candidate.with_model(model);
    }

    let verdict = gate.process(&candidate, args.timeout_ms).await;
    println!("{}", verdict.to_json()?);

    if verdict.is_accepted() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(REJECTED))
    }
}

fn load_config(args: &ValidateArgs) -> Result<GateConfig> {
    let mut config = match &args.config {
        Some(path) => GateConfig::load_with_context(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => GateConfig::default(),
    };

    if let Some(path) = &args.catalog {
        let catalog = SchemaCatalogConfig::from_file(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?;
        config.catalog = Some(catalog);
    }
    if config.catalog.is_none() {
        anyhow::bail!("No catalog given: pass --catalog or a --config with `catalog`/`catalogFile`");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(catalog: Option<PathBuf>, config: Option<PathBuf>) -> ValidateArgs {
        ValidateArgs {
            catalog,
            config,
            model: None,
            correlation_id: None,
            timeout_ms: None,
            sql: "SELECT 1".to_string(),
        }
    }

    fn sample(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../config")
            .join(name)
    }

    #[test]
    fn test_config_file_brings_its_catalog() {
        let config = load_config(&args(None, Some(sample("sqlgate.yaml")))).unwrap();
        assert_eq!(config.require_catalog().unwrap().version, 1);
        assert_eq!(config.bounding.max_rows, 10000);
    }

    #[test]
    fn test_catalog_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "version: 7\ntables:\n  - name: t\n    columns: [{ name: id, type: integer }]\n",
        )
        .unwrap();

        let config = load_config(&args(Some(path), Some(sample("sqlgate.yaml")))).unwrap();
        assert_eq!(config.require_catalog().unwrap().version, 7);
    }

    #[test]
    fn test_missing_catalog_is_an_error() {
        assert!(load_config(&args(None, None)).is_err());
    }
}
