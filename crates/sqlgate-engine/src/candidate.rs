//! Candidate SQL as it arrives from a generator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Untrusted SQL text plus the identifiers needed to audit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCandidate {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_identifier: Option<String>,

    pub correlation_id: String,
}

impl GeneratedCandidate {
    /// A candidate with a fresh random correlation id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model_identifier: None,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = id.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_identifier = Some(model.into());
        self
    }
}
