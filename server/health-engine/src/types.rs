//! Core types for the health engine (JSON contracts + internal models).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound types (JSON contract: what the metadata source / caller sends)
// ---------------------------------------------------------------------------

/// One repository's observed metadata at a single instant.
/// Accepts the search API's native field names as aliases. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
  #[serde(default, alias = "id")]
  pub repo_id: Option<u64>,
  pub full_name: String,
  #[serde(default)]
  pub language: Option<String>,
  #[serde(alias = "stargazers_count")]
  pub stars: u64,
  #[serde(alias = "forks_count")]
  pub forks: u64,
  #[serde(alias = "watchers_count")]
  pub watchers: u64,
  #[serde(alias = "open_issues_count")]
  pub open_issues: u64,
  #[serde(default, alias = "archived")]
  pub is_archived: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub pushed_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub description: Option<String>,
}

/// One request line for the binary: either a raw snapshot or a pre-extracted
/// feature object (keys in contract order). `now` defaults to the wall clock.
#[derive(Debug, Clone, Deserialize)]
pub struct AssessRequest {
  #[serde(default)]
  pub snapshot: Option<RepositorySnapshot>,
  #[serde(default)]
  pub features: Option<serde_json::Map<String, serde_json::Value>>,
  #[serde(default)]
  pub now: Option<String>,
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Typed view of the eight contract features. Field order is contract order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoFeatures {
  pub stars: u64,
  pub forks: u64,
  pub watchers: u64,
  pub open_issues: u64,
  pub days_since_last_push: i64,
  pub repo_age_days: i64,
  pub fork_star_ratio: f64,
  pub has_description: bool,
}

/// Ordered (name, value) columns as fed to the normalizer and classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
  pub(crate) columns: Vec<String>,
  pub(crate) values: Vec<f64>,
}

impl FeatureVector {
  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn get(&self, name: &str) -> Option<f64> {
    self
      .columns
      .iter()
      .position(|c| c == name)
      .map(|i| self.values[i])
  }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
  Healthy,
  AtRisk,
}

impl Label {
  pub fn as_bit(self) -> u8 {
    match self {
      Self::Healthy => 0,
      Self::AtRisk => 1,
    }
  }
}

impl Serialize for Label {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(self.as_bit())
  }
}

// ---------------------------------------------------------------------------
// Output types (JSON contract: what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
  pub at_risk: u8,
  pub risk_probability: f64,
  pub health_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevelopmentState {
  #[serde(rename = "Active Development")]
  ActiveDevelopment,
  #[serde(rename = "Maintenance Mode")]
  MaintenanceMode,
  #[serde(rename = "Low Activity")]
  LowActivity,
}

impl DevelopmentState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ActiveDevelopment => "Active Development",
      Self::MaintenanceMode => "Maintenance Mode",
      Self::LowActivity => "Low Activity",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalStatus {
  #[serde(rename = "Critical (High Abandonment Risk)")]
  Critical,
  #[serde(rename = "At Risk (Low Activity)")]
  AtRisk,
  #[serde(rename = "Stable (Maintenance Mode)")]
  Stable,
  #[serde(rename = "Healthy (Actively Maintained)")]
  Healthy,
}

impl FinalStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Critical => "Critical (High Abandonment Risk)",
      Self::AtRisk => "At Risk (Low Activity)",
      Self::Stable => "Stable (Maintenance Mode)",
      Self::Healthy => "Healthy (Actively Maintained)",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
  pub final_status: FinalStatus,
  pub development_state: DevelopmentState,
  pub recommendations: Vec<String>,
}

/// Everything the engine reports for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub full_name: Option<String>,
  pub features: RepoFeatures,
  #[serde(flatten)]
  pub prediction: Prediction,
  #[serde(flatten)]
  pub decision: Decision,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for a request that could not be assessed.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn snapshot_accepts_search_api_field_names() {
    let json = r#"{
      "id": 42,
      "full_name": "octo/widget",
      "stargazers_count": 10,
      "forks_count": 2,
      "watchers_count": 10,
      "open_issues_count": 1,
      "archived": true,
      "created_at": "2020-01-01T00:00:00Z",
      "pushed_at": "2024-01-01T00:00:00Z",
      "description": null,
      "homepage": "ignored"
    }"#;
    let snap: RepositorySnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(snap.repo_id, Some(42));
    assert_eq!(snap.stars, 10);
    assert!(snap.is_archived);
    assert!(snap.updated_at.is_none());
    assert!(snap.description.is_none());
  }

  #[test]
  fn enum_strings_match_display_names() {
    let json = serde_json::to_string(&DevelopmentState::MaintenanceMode).unwrap();
    assert_eq!(json, format!("\"{}\"", DevelopmentState::MaintenanceMode.as_str()));
    let json = serde_json::to_string(&FinalStatus::Critical).unwrap();
    assert_eq!(json, format!("\"{}\"", FinalStatus::Critical.as_str()));
  }

  #[test]
  fn label_bits() {
    assert_eq!(Label::Healthy.as_bit(), 0);
    assert_eq!(Label::AtRisk.as_bit(), 1);
  }

  #[test]
  fn label_serializes_as_integer() {
    assert_eq!(serde_json::to_string(&Label::Healthy).unwrap(), "0");
    assert_eq!(serde_json::to_string(&Label::AtRisk).unwrap(), "1");
    assert_eq!(
      serde_json::to_string(&[Label::AtRisk, Label::Healthy]).unwrap(),
      "[1,0]"
    );
  }
}
