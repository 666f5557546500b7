//! Feature contract: the canonical ordered feature set and extraction from snapshots.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::{FORK_STAR_SMOOTHING, RATIO_TOLERANCE};
use crate::error::EngineError;
use crate::types::{FeatureVector, RepoFeatures, RepositorySnapshot};

/// Every feature, in the order the normalizer and classifier consume them.
pub const FEATURE_COLUMNS: [&str; 8] = [
  "stars",
  "forks",
  "watchers",
  "open_issues",
  "days_since_last_push",
  "repo_age_days",
  "fork_star_ratio",
  "has_description",
];

/// The scaled subset: everything except `has_description`.
pub const NUMERIC_COLUMNS: [&str; 7] = [
  "stars",
  "forks",
  "watchers",
  "open_issues",
  "days_since_last_push",
  "repo_age_days",
  "fork_star_ratio",
];

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days from `then` to `now`, rounded toward negative infinity.
pub fn days_between(now: &DateTime<Utc>, then: &DateTime<Utc>) -> i64 {
  (*now - *then).num_seconds().div_euclid(SECONDS_PER_DAY)
}

pub fn fork_star_ratio(forks: u64, stars: u64) -> f64 {
  forks as f64 / (stars as f64 + FORK_STAR_SMOOTHING)
}

/// Extract the contract features from a snapshot observed at `now`.
///
/// Missing push/creation timestamps fail with `MissingTimestamp`; a timestamp
/// after `now` is rejected rather than producing a negative age.
pub fn extract(snapshot: &RepositorySnapshot, now: DateTime<Utc>) -> Result<RepoFeatures, EngineError> {
  let pushed_at = snapshot
    .pushed_at
    .as_ref()
    .ok_or_else(|| EngineError::missing_timestamp("pushed_at"))?;
  let created_at = snapshot
    .created_at
    .as_ref()
    .ok_or_else(|| EngineError::missing_timestamp("created_at"))?;

  let days_since_last_push = days_between(&now, pushed_at);
  if days_since_last_push < 0 {
    return Err(EngineError::validation(
      "pushed_at",
      "timestamp is after the observation instant",
    ));
  }
  let repo_age_days = days_between(&now, created_at);
  if repo_age_days < 0 {
    return Err(EngineError::validation(
      "created_at",
      "timestamp is after the observation instant",
    ));
  }

  let has_description = snapshot
    .description
    .as_deref()
    .is_some_and(|d| !d.trim().is_empty());

  Ok(RepoFeatures {
    stars: snapshot.stars,
    forks: snapshot.forks,
    watchers: snapshot.watchers,
    open_issues: snapshot.open_issues,
    days_since_last_push,
    repo_age_days,
    fork_star_ratio: fork_star_ratio(snapshot.forks, snapshot.stars),
    has_description,
  })
}

/// Fail with `SchemaMismatch` unless `names` is exactly the contract, in order.
pub fn validate_columns(names: &[String]) -> Result<(), EngineError> {
  let matches = names.len() == FEATURE_COLUMNS.len()
    && names.iter().zip(FEATURE_COLUMNS.iter()).all(|(a, b)| a == b);
  if matches {
    Ok(())
  } else {
    Err(EngineError::schema_mismatch(&FEATURE_COLUMNS, names))
  }
}

impl RepoFeatures {
  pub fn to_vector(&self) -> FeatureVector {
    FeatureVector {
      columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
      values: vec![
        self.stars as f64,
        self.forks as f64,
        self.watchers as f64,
        self.open_issues as f64,
        self.days_since_last_push as f64,
        self.repo_age_days as f64,
        self.fork_star_ratio,
        if self.has_description { 1.0 } else { 0.0 },
      ],
    }
  }
}

impl FeatureVector {
  /// Build a vector from a JSON object, keeping the caller's key order.
  /// Order is validated later, against the contract, not fixed up here.
  pub fn from_json_map(map: &Map<String, Value>) -> Result<Self, EngineError> {
    let mut columns = Vec::with_capacity(map.len());
    let mut values = Vec::with_capacity(map.len());
    for (name, value) in map {
      let v = match value {
        Value::Bool(b) => {
          if *b {
            1.0
          } else {
            0.0
          }
        }
        Value::Number(n) => n
          .as_f64()
          .ok_or_else(|| EngineError::validation(name, "number is not representable as f64"))?,
        _ => return Err(EngineError::validation(name, "expected a number or boolean")),
      };
      columns.push(name.clone());
      values.push(v);
    }
    Ok(Self { columns, values })
  }
}

fn whole_count(name: &str, v: f64) -> Result<u64, EngineError> {
  if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
    return Err(EngineError::validation(name, "expected a non-negative integer"));
  }
  Ok(v as u64)
}

fn day_count(name: &str, v: f64) -> Result<i64, EngineError> {
  i64::try_from(whole_count(name, v)?).map_err(|_| EngineError::validation(name, "out of range"))
}

impl TryFrom<&FeatureVector> for RepoFeatures {
  type Error = EngineError;

  fn try_from(vector: &FeatureVector) -> Result<Self, Self::Error> {
    validate_columns(&vector.columns)?;
    let v = &vector.values;

    let fork_star_ratio = v[6];
    if !fork_star_ratio.is_finite() || fork_star_ratio < 0.0 {
      return Err(EngineError::validation(
        "fork_star_ratio",
        "expected a non-negative finite number",
      ));
    }
    let has_description = match v[7] {
      x if x == 0.0 => false,
      x if x == 1.0 => true,
      _ => return Err(EngineError::validation("has_description", "expected a boolean or 0/1")),
    };

    let stars = whole_count("stars", v[0])?;
    let forks = whole_count("forks", v[1])?;
    if (fork_star_ratio - self::fork_star_ratio(forks, stars)).abs() > RATIO_TOLERANCE {
      return Err(EngineError::validation(
        "fork_star_ratio",
        "does not match forks / (stars + 1)",
      ));
    }

    Ok(Self {
      stars,
      forks,
      watchers: whole_count("watchers", v[2])?,
      open_issues: whole_count("open_issues", v[3])?,
      days_since_last_push: day_count("days_since_last_push", v[4])?,
      repo_age_days: day_count("repo_age_days", v[5])?,
      fork_star_ratio,
      has_description,
    })
  }
}
