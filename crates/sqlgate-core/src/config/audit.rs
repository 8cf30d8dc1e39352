//! Audit recording configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the audit recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// Whether audit records are emitted at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Write each record as a JSON line on stdout.
    #[serde(default)]
    pub stdout: bool,

    /// Append records as JSON Lines to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Include the canonical SQL text in accepted records (the hash is always present).
    #[serde(default)]
    pub include_sql: bool,

    /// How long a sink write may take before the record is dropped.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            stdout: false,
            file: None,
            include_sql: false,
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_write_timeout_ms() -> u64 {
    1000
}
