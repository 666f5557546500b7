//! Engine configuration with sane defaults, plus the fixed constants the
//! trained artifacts depend on.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Probability at or above which a repository is classified as at risk.
/// Fixed: the classifier was selected against this cut-off.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Added to the star count in `fork_star_ratio = forks / (stars + 1)`.
pub const FORK_STAR_SMOOTHING: f64 = 1.0;

/// Largest accepted difference between a supplied `fork_star_ratio` and the
/// one recomputed from `forks` and `stars`.
pub const RATIO_TOLERANCE: f64 = 1e-4;

/// Scale used for a numeric column whose training variance is zero.
pub const ZERO_VARIANCE_SCALE: f64 = 1.0;

/// Tunable thresholds for the rule-based decision layer.
///
/// Consumers: `decision::development_state` (active/maintenance day bounds),
/// `decision::final_status` (critical score), `decision::recommendations`
/// (maintenance bound, backlog, community ratio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Health scores strictly below this are Critical regardless of activity.
  pub critical_health_score: f64,
  /// Last push at most this many days ago counts as active development.
  pub active_max_days: i64,
  /// Last push at most this many days ago counts as maintenance mode.
  /// Beyond it the repository is low activity.
  pub maintenance_max_days: i64,
  /// More open issues than this triggers the backlog recommendation.
  pub backlog_issue_threshold: u64,
  /// Fork/star ratios below this trigger the community recommendation.
  pub community_ratio_threshold: f64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      critical_health_score: 40.0,
      active_max_days: 60,
      maintenance_max_days: 180,
      backlog_issue_threshold: 50,
      community_ratio_threshold: 0.05,
    }
  }
}

impl Config {
  /// Load overrides from a JSON file; omitted keys keep their defaults.
  pub fn from_file(path: &Path) -> Result<Self, EngineError> {
    let raw = std::fs::read_to_string(path)
      .map_err(|e| EngineError::artifact(path.display().to_string(), e))?;
    let config: Config = serde_json::from_str(&raw)
      .map_err(|e| EngineError::artifact(path.display().to_string(), e))?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), EngineError> {
    if !(0.0..=100.0).contains(&self.critical_health_score) {
      return Err(EngineError::validation(
        "critical_health_score",
        "must be within [0, 100]",
      ));
    }
    if self.active_max_days < 0 || self.maintenance_max_days < self.active_max_days {
      return Err(EngineError::validation(
        "maintenance_max_days",
        "must be >= active_max_days >= 0",
      ));
    }
    if !self.community_ratio_threshold.is_finite() || self.community_ratio_threshold < 0.0 {
      return Err(EngineError::validation(
        "community_ratio_threshold",
        "must be a non-negative finite number",
      ));
    }
    Ok(())
  }
}
