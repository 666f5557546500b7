//! Ground-truth labeling of snapshots for training-set preparation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::features;
use crate::types::{Label, RepoFeatures, RepositorySnapshot};

/// Versioned thresholds of the labeling rule.
///
/// Trained artifacts record the version they were labeled with; changing any
/// threshold requires a new version and a retrain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelRule {
  pub version: &'static str,
  /// Days without a push after which a repository is at risk outright.
  pub abandoned_days: i64,
  /// Days without a push after which issue pressure is taken into account.
  pub stale_days: i64,
  /// Open issues per day of age above which a stale repository is at risk.
  pub max_issue_pressure: f64,
}

impl LabelRule {
  pub const V1: LabelRule = LabelRule {
    version: "label-v1",
    abandoned_days: 365,
    stale_days: 180,
    max_issue_pressure: 0.1,
  };

  pub fn label(&self, input: &LabelInput) -> Result<Label, EngineError> {
    if input.repo_age_days < 0 {
      return Err(EngineError::validation(
        "repo_age_days",
        "must be >= 0 to compute issue pressure",
      ));
    }
    if input.days_since_last_push < 0 {
      return Err(EngineError::validation(
        "days_since_last_push",
        "must be >= 0",
      ));
    }

    let at_risk = input.is_archived
      || input.days_since_last_push >= self.abandoned_days
      || (input.days_since_last_push >= self.stale_days
        && issue_pressure(input.open_issues, input.repo_age_days) > self.max_issue_pressure);

    Ok(if at_risk { Label::AtRisk } else { Label::Healthy })
  }
}

impl Default for LabelRule {
  fn default() -> Self {
    Self::V1
  }
}

/// Derived fields the rule needs from a snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LabelInput {
  pub is_archived: bool,
  pub days_since_last_push: i64,
  pub open_issues: u64,
  pub repo_age_days: i64,
}

impl LabelInput {
  pub fn derive(snapshot: &RepositorySnapshot, features: &RepoFeatures) -> Self {
    Self {
      is_archived: snapshot.is_archived,
      days_since_last_push: features.days_since_last_push,
      open_issues: features.open_issues,
      repo_age_days: features.repo_age_days,
    }
  }
}

/// Open issues per day of repository age. Caller guarantees `repo_age_days >= 0`.
pub fn issue_pressure(open_issues: u64, repo_age_days: i64) -> f64 {
  open_issues as f64 / (repo_age_days as f64 + 1.0)
}

/// Label a raw snapshot, deriving day counts through feature extraction.
pub fn label_snapshot(
  rule: &LabelRule,
  snapshot: &RepositorySnapshot,
  now: DateTime<Utc>,
) -> Result<Label, EngineError> {
  let f = features::extract(snapshot, now)?;
  rule.label(&LabelInput::derive(snapshot, &f))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input(days: i64, issues: u64, age: i64) -> LabelInput {
    LabelInput {
      is_archived: false,
      days_since_last_push: days,
      open_issues: issues,
      repo_age_days: age,
    }
  }

  #[test]
  fn abandoned_boundary() {
    let rule = LabelRule::V1;
    assert_eq!(rule.label(&input(364, 0, 100)).unwrap(), Label::Healthy);
    assert_eq!(rule.label(&input(365, 0, 100)).unwrap(), Label::AtRisk);
  }

  #[test]
  fn archived_is_always_at_risk() {
    let rule = LabelRule::V1;
    let mut i = input(0, 0, 1000);
    i.is_archived = true;
    assert_eq!(rule.label(&i).unwrap(), Label::AtRisk);
  }

  #[test]
  fn stale_with_issue_pressure() {
    let rule = LabelRule::V1;
    // 20 issues over 100 days: pressure ~0.198.
    assert_eq!(rule.label(&input(180, 20, 99)).unwrap(), Label::AtRisk);
    assert_eq!(rule.label(&input(179, 20, 99)).unwrap(), Label::Healthy);
    // 10 issues over 100 days: pressure exactly 0.1 is not above the bound.
    assert_eq!(rule.label(&input(200, 10, 99)).unwrap(), Label::Healthy);
  }

  #[test]
  fn negative_age_rejected() {
    let err = LabelRule::V1.label(&input(10, 0, -1)).unwrap_err();
    assert!(err.to_string().contains("repo_age_days"));
  }

  #[test]
  fn snapshot_labeled_through_extraction() {
    use chrono::{Duration, TimeZone};
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let mut snap = RepositorySnapshot {
      repo_id: None,
      full_name: "octo/stale".into(),
      language: None,
      stars: 10,
      forks: 0,
      watchers: 10,
      open_issues: 30,
      is_archived: false,
      created_at: Some(now - Duration::days(199)),
      updated_at: None,
      pushed_at: Some(now - Duration::days(190)),
      description: None,
    };
    // 30 issues over 200 days: pressure 0.15 after 190 quiet days.
    assert_eq!(label_snapshot(&LabelRule::V1, &snap, now).unwrap(), Label::AtRisk);
    snap.open_issues = 5;
    assert_eq!(label_snapshot(&LabelRule::V1, &snap, now).unwrap(), Label::Healthy);
    snap.pushed_at = None;
    assert!(matches!(
      label_snapshot(&LabelRule::V1, &snap, now),
      Err(EngineError::MissingTimestamp { .. })
    ));
  }

  #[test]
  fn zero_age_is_defined() {
    assert_eq!(issue_pressure(3, 0), 3.0);
  }
}
