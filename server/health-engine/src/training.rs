//! Training-set preparation: label snapshots, fit the normalizer, emit scaled rows.
//!
//! Runs as a separate maintenance phase; inference never calls into here.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::EngineError;
use crate::features::{self, FEATURE_COLUMNS};
use crate::label::{LabelInput, LabelRule};
use crate::normalizer::{self, NormalizationState};
use crate::types::{RepoFeatures, RepositorySnapshot};

/// A snapshot that could not be turned into a training row.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedSnapshot {
  pub full_name: String,
  pub reason: String,
}

/// Scaled feature matrix, labels, and the state that scaled it.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSet {
  pub columns: Vec<String>,
  pub label_rule_version: String,
  pub normalization_tag: String,
  pub rows: Vec<Vec<f64>>,
  pub labels: Vec<u8>,
  pub rejected: Vec<RejectedSnapshot>,
  #[serde(skip)]
  pub state: NormalizationState,
}

impl TrainingSet {
  /// Fraction of rows labeled at risk.
  pub fn at_risk_share(&self) -> f64 {
    if self.labels.is_empty() {
      return 0.0;
    }
    self.labels.iter().filter(|&&l| l == 1).count() as f64 / self.labels.len() as f64
  }
}

fn row(snapshot: &RepositorySnapshot, now: DateTime<Utc>, rule: &LabelRule) -> Result<(RepoFeatures, u8), EngineError> {
  let f = features::extract(snapshot, now)?;
  let label = rule.label(&LabelInput::derive(snapshot, &f))?;
  Ok((f, label.as_bit()))
}

/// Build the training set. Snapshots that fail extraction or labeling are
/// rejected (never zero-filled); fitting fails if nothing is left.
pub fn prepare(
  snapshots: &[RepositorySnapshot],
  now: DateTime<Utc>,
  rule: &LabelRule,
) -> Result<TrainingSet, EngineError> {
  let mut accepted = Vec::with_capacity(snapshots.len());
  let mut labels = Vec::with_capacity(snapshots.len());
  let mut rejected = Vec::new();

  for snapshot in snapshots {
    match row(snapshot, now, rule) {
      Ok((f, label)) => {
        accepted.push(f);
        labels.push(label);
      }
      Err(e) => {
        log::warn!("rejecting {}: {}", snapshot.full_name, e);
        rejected.push(RejectedSnapshot {
          full_name: snapshot.full_name.clone(),
          reason: e.to_string(),
        });
      }
    }
  }

  let state = normalizer::fit(&accepted, rule)?;
  let rows = accepted
    .iter()
    .map(|f| normalizer::transform(&f.to_vector(), &state))
    .collect::<Result<Vec<_>, EngineError>>()?;

  let set = TrainingSet {
    columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
    label_rule_version: rule.version.to_string(),
    normalization_tag: state.compatibility_tag(),
    rows,
    labels,
    rejected,
    state,
  };
  log::info!(
    "training set: {} rows, {} rejected, {:.3} at risk",
    set.rows.len(),
    set.rejected.len(),
    set.at_risk_share()
  );
  Ok(set)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
  }

  fn snap(name: &str, pushed_days_ago: Option<i64>, archived: bool) -> RepositorySnapshot {
    RepositorySnapshot {
      repo_id: None,
      full_name: name.into(),
      language: None,
      stars: 100,
      forks: 5,
      watchers: 100,
      open_issues: 2,
      is_archived: archived,
      created_at: Some(now() - Duration::days(800)),
      updated_at: None,
      pushed_at: pushed_days_ago.map(|d| now() - Duration::days(d)),
      description: None,
    }
  }

  #[test]
  fn labels_and_scales_accepted_rows() {
    let snaps = vec![
      snap("a/active", Some(3), false),
      snap("b/abandoned", Some(400), false),
      snap("c/archived", Some(10), true),
    ];
    let set = prepare(&snaps, now(), &LabelRule::V1).unwrap();
    assert_eq!(set.labels, vec![0, 1, 1]);
    assert_eq!(set.rows.len(), 3);
    assert!(set.rows.iter().all(|r| r.len() == FEATURE_COLUMNS.len()));
    assert_eq!(set.normalization_tag, set.state.compatibility_tag());
    assert!((set.at_risk_share() - 2.0 / 3.0).abs() < 1e-12);
  }

  #[test]
  fn snapshots_without_push_are_rejected() {
    let snaps = vec![snap("a/ok", Some(3), false), snap("b/never", None, false)];
    let set = prepare(&snaps, now(), &LabelRule::V1).unwrap();
    assert_eq!(set.rows.len(), 1);
    assert_eq!(set.rejected.len(), 1);
    assert_eq!(set.rejected[0].full_name, "b/never");
    assert!(set.rejected[0].reason.contains("pushed_at"));
  }

  #[test]
  fn nothing_usable_is_empty_training_set() {
    let snaps = vec![snap("b/never", None, false)];
    let err = prepare(&snaps, now(), &LabelRule::V1).unwrap_err();
    assert!(matches!(err, EngineError::EmptyTrainingSet));
  }
}
