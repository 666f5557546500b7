//! Core engine: turns one request into an assessment using the loaded artifacts.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::decision;
use crate::error::EngineError;
use crate::features;
use crate::model::Artifacts;
use crate::scorer;
use crate::types::*;

/// The assessment engine. Holds read-only config and artifacts; safe to share.
#[derive(Clone)]
pub struct Engine {
  config: Config,
  artifacts: Arc<Artifacts>,
}

impl Engine {
  pub fn new(config: Config, artifacts: Arc<Artifacts>) -> Self {
    Self { config, artifacts }
  }

  pub fn with_defaults(artifacts: Arc<Artifacts>) -> Self {
    Self::new(Config::default(), artifacts)
  }

  /// Assess one request line. `default_now` is used when the request has no `now`.
  pub fn process(&self, req: &AssessRequest, default_now: DateTime<Utc>) -> Result<Assessment, EngineError> {
    let now = match &req.now {
      Some(raw) => DateTime::parse_from_rfc3339(raw)
        .map_err(|e| EngineError::validation("now", &format!("invalid RFC3339: {}", e)))?
        .with_timezone(&Utc),
      None => default_now,
    };

    match (&req.snapshot, &req.features) {
      (Some(snapshot), None) => self.assess_snapshot(snapshot, now),
      (None, Some(map)) => {
        let vector = FeatureVector::from_json_map(map)?;
        self.assess_vector(&vector, None)
      }
      (Some(_), Some(_)) => Err(EngineError::validation(
        "request",
        "expected exactly one of snapshot or features, got both",
      )),
      (None, None) => Err(EngineError::validation(
        "request",
        "expected exactly one of snapshot or features",
      )),
    }
  }

  pub fn assess_snapshot(&self, snapshot: &RepositorySnapshot, now: DateTime<Utc>) -> Result<Assessment, EngineError> {
    let f = features::extract(snapshot, now)?;
    self.assess_vector(&f.to_vector(), Some(snapshot.full_name.clone()))
  }

  pub fn assess_vector(&self, vector: &FeatureVector, full_name: Option<String>) -> Result<Assessment, EngineError> {
    let features = RepoFeatures::try_from(vector)?;
    let prediction = scorer::score(
      vector,
      self.artifacts.classifier(),
      self.artifacts.normalization(),
    )?;
    let decision = decision::decide(&prediction, &features, &self.config);

    log::debug!(
      "assessed {}: {} / {}",
      full_name.as_deref().unwrap_or("<features>"),
      decision.final_status.as_str(),
      decision.development_state.as_str()
    );

    Ok(Assessment {
      full_name,
      features,
      prediction,
      decision,
    })
  }
}
