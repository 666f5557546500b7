//! Structured error types for the health engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("missing timestamp: {field}")]
  MissingTimestamp { field: String },

  #[error("empty training set: cannot fit normalization state on zero rows")]
  EmptyTrainingSet,

  #[error("schema mismatch: expected [{expected}], found [{found}]")]
  SchemaMismatch { expected: String, found: String },

  #[error("stale normalization state: classifier expects {expected}, scaler is {found}")]
  StaleNormalizationState { expected: String, found: String },

  #[error("label rule mismatch: expected {expected}, found {found}")]
  LabelRuleMismatch { expected: String, found: String },

  #[error("upstream fetch: {0}")]
  UpstreamFetch(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("artifact {path}: {reason}")]
  Artifact { path: String, reason: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn missing_timestamp(field: &str) -> Self {
    Self::MissingTimestamp {
      field: field.to_string(),
    }
  }

  pub fn schema_mismatch(expected: &[&str], found: &[String]) -> Self {
    Self::SchemaMismatch {
      expected: expected.join(", "),
      found: found.join(", "),
    }
  }

  pub fn artifact(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
    Self::Artifact {
      path: path.into(),
      reason: reason.to_string(),
    }
  }

  pub fn upstream(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self::UpstreamFetch(err.into())
  }

  /// Field the error is attributed to, when there is one.
  pub fn field(&self) -> Option<&str> {
    match self {
      Self::MissingTimestamp { field } | Self::Validation { field, .. } => Some(field.as_str()),
      _ => None,
    }
  }
}
