//! Standard scaling of the numeric feature subset: fit once on the training
//! rows, then apply the captured parameters to every inference vector.

use serde::{Deserialize, Serialize};

use crate::config::ZERO_VARIANCE_SCALE;
use crate::error::EngineError;
use crate::features::{self, FEATURE_COLUMNS, NUMERIC_COLUMNS};
use crate::label::LabelRule;
use crate::types::{FeatureVector, RepoFeatures};

/// Fitted per-column parameters. Read-only after `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationState {
  pub columns: Vec<String>,
  pub mean: Vec<f64>,
  pub scale: Vec<f64>,
  pub n_samples: usize,
  pub label_rule_version: String,
}

impl NormalizationState {
  /// Stable identifier of this exact state; classifiers trained against it
  /// carry the same tag.
  pub fn compatibility_tag(&self) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in FEATURE_COLUMNS {
      hasher.update(c.as_bytes());
      hasher.update(b"|");
    }
    for c in &self.columns {
      hasher.update(c.as_bytes());
      hasher.update(b"|");
    }
    hasher.update(self.label_rule_version.as_bytes());
    hasher.update(&(self.n_samples as u64).to_le_bytes());
    for (m, s) in self.mean.iter().zip(&self.scale) {
      hasher.update(&m.to_bits().to_le_bytes());
      hasher.update(&s.to_bits().to_le_bytes());
    }
    let hex = hasher.finalize().to_hex();
    format!("ns-{}", &hex[..16])
  }

  fn check_columns(&self) -> Result<(), EngineError> {
    let ok = self.columns.len() == NUMERIC_COLUMNS.len()
      && self.columns.iter().zip(NUMERIC_COLUMNS.iter()).all(|(a, b)| a == b)
      && self.mean.len() == NUMERIC_COLUMNS.len()
      && self.scale.len() == NUMERIC_COLUMNS.len();
    if ok {
      Ok(())
    } else {
      Err(EngineError::schema_mismatch(&NUMERIC_COLUMNS, &self.columns))
    }
  }

  /// Structural checks for a state loaded from disk.
  pub fn validate(&self) -> Result<(), EngineError> {
    self.check_columns()?;
    if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
      return Err(EngineError::validation("scale", "must be finite and > 0"));
    }
    if self.mean.iter().any(|m| !m.is_finite()) {
      return Err(EngineError::validation("mean", "must be finite"));
    }
    Ok(())
  }
}

/// Fit population mean and standard deviation for each numeric column.
pub fn fit(rows: &[RepoFeatures], rule: &LabelRule) -> Result<NormalizationState, EngineError> {
  if rows.is_empty() {
    return Err(EngineError::EmptyTrainingSet);
  }
  let n = rows.len() as f64;
  let width = NUMERIC_COLUMNS.len();

  let matrix: Vec<Vec<f64>> = rows
    .iter()
    .map(|r| r.to_vector().values[..width].to_vec())
    .collect();
  if let Some(i) = matrix
    .iter()
    .find_map(|row| row.iter().position(|v| !v.is_finite()))
  {
    return Err(EngineError::validation(NUMERIC_COLUMNS[i], "non-finite value in training set"));
  }

  let mut mean = vec![0.0; width];
  for row in &matrix {
    for (m, v) in mean.iter_mut().zip(row) {
      *m += v;
    }
  }
  for m in mean.iter_mut() {
    *m /= n;
  }

  let mut var = vec![0.0; width];
  for row in &matrix {
    for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
      *acc += (v - m) * (v - m);
    }
  }

  let scale = var
    .into_iter()
    .map(|acc| {
      let std = (acc / n).sqrt();
      if std > f64::EPSILON {
        std
      } else {
        ZERO_VARIANCE_SCALE
      }
    })
    .collect();

  Ok(NormalizationState {
    columns: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
    mean,
    scale,
    n_samples: rows.len(),
    label_rule_version: rule.version.to_string(),
  })
}

/// Scale a contract vector's numeric subset with the fitted state.
/// Returns the full model input: scaled numerics followed by `has_description`.
pub fn transform(vector: &FeatureVector, state: &NormalizationState) -> Result<Vec<f64>, EngineError> {
  features::validate_columns(vector.columns())?;
  state.check_columns()?;

  let mut out = vector.values().to_vec();
  for (i, v) in out.iter_mut().take(NUMERIC_COLUMNS.len()).enumerate() {
    *v = (*v - state.mean[i]) / state.scale[i];
  }
  Ok(out)
}

/// Undo `transform` on a model-input row.
pub fn inverse_transform(values: &[f64], state: &NormalizationState) -> Result<Vec<f64>, EngineError> {
  state.check_columns()?;
  if values.len() != FEATURE_COLUMNS.len() {
    return Err(EngineError::validation(
      "values",
      &format!("expected {} values, got {}", FEATURE_COLUMNS.len(), values.len()),
    ));
  }
  let mut out = values.to_vec();
  for (i, v) in out.iter_mut().take(NUMERIC_COLUMNS.len()).enumerate() {
    *v = *v * state.scale[i] + state.mean[i];
  }
  Ok(out)
}
