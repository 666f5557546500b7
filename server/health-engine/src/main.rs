//! Binary entrypoint: read JSON lines from stdin, write JSON lines to stdout.
//!
//! Each input line is an AssessRequest. Output lines are either:
//! - An Assessment (prediction + decision)
//! - An ErrorOutput (when the request cannot be assessed)
//!
//! Artifacts are loaded once, before the first line is read. Logs go to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::Utc;
use health_engine::types::ErrorOutput;
use health_engine::{ArtifactCache, AssessRequest, Config, Engine, EngineError};

const DEFAULT_MODEL_PATH: &str = "models/final_model.json";
const DEFAULT_SCALER_PATH: &str = "data/features/scaler.json";

fn env_path(key: &str, default: &str) -> PathBuf {
  std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn load_engine() -> Result<Engine, EngineError> {
  let config = match std::env::var("HEALTH_ENGINE_CONFIG") {
    Ok(path) => Config::from_file(&PathBuf::from(path))?,
    Err(_) => Config::default(),
  };
  let cache = ArtifactCache::new(
    env_path("HEALTH_ENGINE_MODEL", DEFAULT_MODEL_PATH),
    env_path("HEALTH_ENGINE_SCALER", DEFAULT_SCALER_PATH),
  );
  Ok(Engine::new(config, cache.get_or_load()?))
}

fn write_error(out: &mut impl Write, e: &EngineError) {
  let mut err = ErrorOutput::new(e.to_string());
  if let Some(field) = e.field() {
    err = err.with_field(field);
  }
  let _ = serde_json::to_writer(&mut *out, &err);
  let _ = writeln!(out);
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let engine = match load_engine() {
    Ok(e) => e,
    Err(e) => {
      log::error!("cannot start: {}", e);
      std::process::exit(1);
    }
  };

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        log::error!("read error: {}", e);
        std::process::exit(1);
      }
    };

    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let req: AssessRequest = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        write_error(&mut out, &EngineError::from(e));
        continue;
      }
    };

    match engine.process(&req, Utc::now()) {
      Ok(assessment) => {
        let _ = serde_json::to_writer(&mut out, &assessment);
        let _ = writeln!(out);
      }
      Err(e) => {
        log::warn!("request rejected: {}", e);
        write_error(&mut out, &e);
      }
    }
  }

  let _ = out.flush();
}
