//! Rule-based activity classification, status fusion and recommendations.
//!
//! Inputs are assumed to have passed feature-contract validation; nothing here fails.

use crate::config::Config;
use crate::types::{Decision, DevelopmentState, FinalStatus, Prediction, RepoFeatures};

pub const REC_ACTIVITY: &str = "Increase commit activity to demonstrate active maintenance.";
pub const REC_BACKLOG: &str = "Reduce open issue backlog to improve maintainability.";
pub const REC_COMMUNITY: &str = "Encourage community contributions and improve onboarding.";
pub const REC_DOCUMENTATION: &str = "Add a clear project description and README.";
pub const REC_WELL_MAINTAINED: &str = "Repository appears well-maintained. Continue current practices.";

/// Classify by days since the last push. Each bound belongs to the more active state.
pub fn development_state(features: &RepoFeatures, config: &Config) -> DevelopmentState {
  let d = features.days_since_last_push;
  if d <= config.active_max_days {
    DevelopmentState::ActiveDevelopment
  } else if d <= config.maintenance_max_days {
    DevelopmentState::MaintenanceMode
  } else {
    DevelopmentState::LowActivity
  }
}

/// First match wins: a critical score overrides any activity signal.
pub fn final_status(health_score: f64, features: &RepoFeatures, config: &Config) -> FinalStatus {
  if health_score < config.critical_health_score {
    return FinalStatus::Critical;
  }
  match development_state(features, config) {
    DevelopmentState::LowActivity => FinalStatus::AtRisk,
    DevelopmentState::MaintenanceMode => FinalStatus::Stable,
    DevelopmentState::ActiveDevelopment => FinalStatus::Healthy,
  }
}

/// Fixed-order checklist; falls back to a single "well-maintained" message.
pub fn recommendations(features: &RepoFeatures, config: &Config) -> Vec<String> {
  let mut recs = Vec::new();
  if features.days_since_last_push > config.maintenance_max_days {
    recs.push(REC_ACTIVITY.to_string());
  }
  if features.open_issues > config.backlog_issue_threshold {
    recs.push(REC_BACKLOG.to_string());
  }
  if features.fork_star_ratio < config.community_ratio_threshold {
    recs.push(REC_COMMUNITY.to_string());
  }
  if !features.has_description {
    recs.push(REC_DOCUMENTATION.to_string());
  }
  if recs.is_empty() {
    recs.push(REC_WELL_MAINTAINED.to_string());
  }
  recs
}

pub fn decide(prediction: &Prediction, features: &RepoFeatures, config: &Config) -> Decision {
  Decision {
    final_status: final_status(prediction.health_score, features, config),
    development_state: development_state(features, config),
    recommendations: recommendations(features, config),
  }
}
