//! Risk probability and health score from a contract feature vector.

use crate::config::DECISION_THRESHOLD;
use crate::error::EngineError;
use crate::model::Classifier;
use crate::normalizer::{self, NormalizationState};
use crate::types::{FeatureVector, Prediction};

/// Round half away from zero to `places` decimals.
pub fn round_to(x: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (x * factor).round() / factor
}

/// Score one vector. Pure given its three inputs.
pub fn score(
  vector: &FeatureVector,
  classifier: &dyn Classifier,
  state: &NormalizationState,
) -> Result<Prediction, EngineError> {
  let x = normalizer::transform(vector, state)?;

  let p = classifier.predict_probability(&x);
  if !p.is_finite() || !(0.0..=1.0).contains(&p) {
    return Err(EngineError::validation(
      "risk_probability",
      &format!("classifier returned {} outside [0, 1]", p),
    ));
  }

  let prediction = Prediction {
    at_risk: u8::from(p >= DECISION_THRESHOLD),
    risk_probability: round_to(p, 4),
    health_score: round_to((1.0 - p) * 100.0, 2),
  };
  log::debug!(
    "scored vector: p={:.6} health={} at_risk={}",
    p,
    prediction.health_score,
    prediction.at_risk
  );
  Ok(prediction)
}
