//! Trained classifier artifacts and their pairing with the normalization state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::features::FEATURE_COLUMNS;
use crate::label::LabelRule;
use crate::normalizer::NormalizationState;

/// A trained binary classifier over scaled contract features.
pub trait Classifier: Send + Sync {
  /// Probability of the positive ("at risk") class for one model-input row.
  fn predict_probability(&self, features: &[f64]) -> f64;
}

/// Logistic regression over the contract features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
  pub intercept: f64,
  pub coefficients: Vec<f64>,
}

impl Classifier for LogisticModel {
  fn predict_probability(&self, features: &[f64]) -> f64 {
    let z = self.intercept
      + self
        .coefficients
        .iter()
        .zip(features)
        .map(|(w, x)| w * x)
        .sum::<f64>();
    1.0 / (1.0 + (-z).exp())
  }
}

/// Serialized classifier plus the identity of the scaler it was trained against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierArtifact {
  pub name: String,
  pub label_rule_version: String,
  pub normalization_tag: String,
  pub model: LogisticModel,
}

impl ClassifierArtifact {
  pub fn paired_with(state: &NormalizationState, name: impl Into<String>, model: LogisticModel) -> Self {
    Self {
      name: name.into(),
      label_rule_version: state.label_rule_version.clone(),
      normalization_tag: state.compatibility_tag(),
      model,
    }
  }
}

/// A classifier and the normalization state it was trained with, verified as a pair.
#[derive(Debug, Clone)]
pub struct Artifacts {
  classifier: ClassifierArtifact,
  normalization: NormalizationState,
}

impl Artifacts {
  pub fn new(classifier: ClassifierArtifact, normalization: NormalizationState) -> Result<Self, EngineError> {
    normalization.validate()?;

    let found = normalization.compatibility_tag();
    if classifier.normalization_tag != found {
      return Err(EngineError::StaleNormalizationState {
        expected: classifier.normalization_tag.clone(),
        found,
      });
    }

    let current = LabelRule::V1.version;
    for version in [&classifier.label_rule_version, &normalization.label_rule_version] {
      if version != current {
        return Err(EngineError::LabelRuleMismatch {
          expected: current.to_string(),
          found: version.clone(),
        });
      }
    }

    if classifier.model.coefficients.len() != FEATURE_COLUMNS.len() {
      return Err(EngineError::validation(
        "coefficients",
        &format!(
          "expected {} coefficients, got {}",
          FEATURE_COLUMNS.len(),
          classifier.model.coefficients.len()
        ),
      ));
    }

    Ok(Self {
      classifier,
      normalization,
    })
  }

  /// Load both artifacts together. Neither is usable on its own.
  pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, EngineError> {
    let classifier: ClassifierArtifact = read_json(model_path)?;
    let normalization: NormalizationState = read_json(scaler_path)?;
    let artifacts = Self::new(classifier, normalization)?;
    log::info!(
      "loaded classifier {} paired with {} ({} training rows)",
      artifacts.classifier.name,
      artifacts.classifier.normalization_tag,
      artifacts.normalization.n_samples
    );
    Ok(artifacts)
  }

  pub fn classifier(&self) -> &dyn Classifier {
    &self.classifier.model
  }

  pub fn classifier_name(&self) -> &str {
    &self.classifier.name
  }

  pub fn normalization(&self) -> &NormalizationState {
    &self.normalization
  }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, EngineError> {
  let raw = std::fs::read_to_string(path)
    .map_err(|e| EngineError::artifact(path.display().to_string(), e))?;
  serde_json::from_str(&raw).map_err(|e| EngineError::artifact(path.display().to_string(), e))
}

/// Write an artifact as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), EngineError> {
  let json = serde_json::to_string_pretty(value)?;
  std::fs::write(path, json).map_err(|e| EngineError::artifact(path.display().to_string(), e))
}

/// Process-lifetime holder for the loaded artifacts.
///
/// Loaded on first use and never reloaded or refit; dropping the cache
/// releases them.
pub struct ArtifactCache {
  model_path: PathBuf,
  scaler_path: PathBuf,
  cell: OnceLock<Arc<Artifacts>>,
}

impl ArtifactCache {
  pub fn new(model_path: impl Into<PathBuf>, scaler_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      scaler_path: scaler_path.into(),
      cell: OnceLock::new(),
    }
  }

  pub fn get_or_load(&self) -> Result<Arc<Artifacts>, EngineError> {
    if let Some(loaded) = self.cell.get() {
      return Ok(Arc::clone(loaded));
    }
    let loaded = Arc::new(Artifacts::load(&self.model_path, &self.scaler_path)?);
    Ok(Arc::clone(self.cell.get_or_init(|| loaded)))
  }

  pub fn is_loaded(&self) -> bool {
    self.cell.get().is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalizer;
  use crate::types::RepoFeatures;

  fn state() -> NormalizationState {
    let rows: Vec<RepoFeatures> = (1..=4)
      .map(|i| RepoFeatures {
        stars: i * 100,
        forks: i * 10,
        watchers: i * 100,
        open_issues: i,
        days_since_last_push: (i * 30) as i64,
        repo_age_days: 1000,
        fork_star_ratio: 0.1,
        has_description: i % 2 == 0,
      })
      .collect();
    normalizer::fit(&rows, &LabelRule::V1).unwrap()
  }

  fn model() -> LogisticModel {
    LogisticModel {
      intercept: 0.0,
      coefficients: vec![0.0; 8],
    }
  }

  #[test]
  fn sigmoid_of_zero_is_half() {
    assert!((model().predict_probability(&[1.0; 8]) - 0.5).abs() < 1e-12);
  }

  #[test]
  fn probabilities_stay_in_unit_interval() {
    let m = LogisticModel {
      intercept: 0.0,
      coefficients: vec![1000.0; 8],
    };
    let hi = m.predict_probability(&[10.0; 8]);
    let lo = m.predict_probability(&[-10.0; 8]);
    assert!((0.0..=1.0).contains(&hi));
    assert!((0.0..=1.0).contains(&lo));
  }

  #[test]
  fn paired_artifacts_accepted() {
    let s = state();
    let c = ClassifierArtifact::paired_with(&s, "logreg", model());
    assert!(Artifacts::new(c, s).is_ok());
  }

  #[test]
  fn refit_scaler_is_stale() {
    let s = state();
    let c = ClassifierArtifact::paired_with(&s, "logreg", model());
    let mut other = s.clone();
    other.mean[0] += 1.0;
    let err = Artifacts::new(c, other).unwrap_err();
    assert!(matches!(err, EngineError::StaleNormalizationState { .. }));
  }

  #[test]
  fn wrong_width_rejected() {
    let s = state();
    let mut m = model();
    m.coefficients.pop();
    let c = ClassifierArtifact::paired_with(&s, "logreg", m);
    let err = Artifacts::new(c, s).unwrap_err();
    assert!(err.to_string().contains("coefficients"));
  }

  #[test]
  fn old_label_rule_rejected() {
    let mut s = state();
    s.label_rule_version = "label-v0".into();
    let c = ClassifierArtifact::paired_with(&s, "logreg", model());
    let err = Artifacts::new(c, s).unwrap_err();
    assert!(matches!(err, EngineError::LabelRuleMismatch { .. }));
  }

  #[test]
  fn cache_loads_once() {
    let dir = tempfile::tempdir().unwrap();
    let s = state();
    let model_path = dir.path().join("model.json");
    let scaler_path = dir.path().join("scaler.json");
    write_json(&model_path, &ClassifierArtifact::paired_with(&s, "logreg", model())).unwrap();
    write_json(&scaler_path, &s).unwrap();

    let cache = ArtifactCache::new(&model_path, &scaler_path);
    assert!(!cache.is_loaded());
    let first = cache.get_or_load().unwrap();

    // Removing the files proves the second call does not reload.
    std::fs::remove_file(&model_path).unwrap();
    let second = cache.get_or_load().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn missing_scaler_is_artifact_error() {
    let dir = tempfile::tempdir().unwrap();
    let s = state();
    let model_path = dir.path().join("model.json");
    write_json(&model_path, &ClassifierArtifact::paired_with(&s, "logreg", model())).unwrap();

    let err = Artifacts::load(&model_path, &dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, EngineError::Artifact { .. }));
  }
}
