//! feature-prep: label repository snapshots and fit the normalization state
//!
//! Usage:
//!   feature-prep <snapshots.jsonl> <out_dir>
//!   feature-prep <snapshots.jsonl> <out_dir> --now 2025-06-01T00:00:00Z
//!   feature-prep <snapshots.jsonl> <out_dir> --query "language:python stars:>500" --limit 300
//!
//! Writes `training_set.json` (scaled rows + labels) and `scaler.json` (the
//! normalization state a classifier must be trained and served with).
//! Without --query, every snapshot in the file is used.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use chrono::{DateTime, Utc};
use health_engine::model::write_json;
use health_engine::source::{collect, SnapshotFile};
use health_engine::training::{self, TrainingSet};
use health_engine::{EngineError, LabelRule};

const DEFAULT_LIMIT: usize = 100;

struct Args {
    input: PathBuf,
    out_dir: PathBuf,
    now: DateTime<Utc>,
    queries: Vec<(String, usize)>,
}

fn usage() -> ! {
    eprintln!("Usage: feature-prep <snapshots.jsonl> <out_dir> [--now RFC3339] [--query Q [--limit N]]...");
    eprintln!("  --now    observation instant for day counts (default: current time)");
    eprintln!("  --query  search query applied to the snapshot file; repeatable");
    eprintln!("  --limit  max repositories for the preceding --query (default: {})", DEFAULT_LIMIT);
    process::exit(2);
}

fn parse_args(raw: &[String]) -> Args {
    let mut positional = Vec::new();
    let mut now = Utc::now();
    let mut queries: Vec<(String, usize)> = Vec::new();

    let mut it = raw.iter().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--now" => {
                let v = it.next().unwrap_or_else(|| usage());
                now = DateTime::parse_from_rfc3339(v)
                    .unwrap_or_else(|e| {
                        eprintln!("feature-prep: invalid --now {}: {}", v, e);
                        process::exit(2);
                    })
                    .with_timezone(&Utc);
            }
            "--query" => {
                let v = it.next().unwrap_or_else(|| usage());
                queries.push((v.clone(), DEFAULT_LIMIT));
            }
            "--limit" => {
                let v = it.next().unwrap_or_else(|| usage());
                let limit = v.parse().unwrap_or_else(|_| {
                    eprintln!("feature-prep: invalid --limit {}", v);
                    process::exit(2);
                });
                match queries.last_mut() {
                    Some(q) => q.1 = limit,
                    None => usage(),
                }
            }
            s if s.starts_with('-') => usage(),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    if positional.len() != 2 {
        usage();
    }
    let out_dir = positional.pop().unwrap_or_default();
    let input = positional.pop().unwrap_or_default();
    Args {
        input,
        out_dir,
        now,
        queries,
    }
}

fn build(args: &Args) -> Result<TrainingSet, EngineError> {
    let file = fs::File::open(&args.input)
        .map_err(|e| EngineError::artifact(args.input.display().to_string(), e))?;
    let source = SnapshotFile::from_reader(BufReader::new(file))?;
    log::info!("loaded {} snapshots from {}", source.len(), args.input.display());

    let snapshots = if args.queries.is_empty() {
        source.snapshots().to_vec()
    } else {
        collect(&source, &args.queries)?
    };
    training::prepare(&snapshots, args.now, &LabelRule::V1)
}

fn write_outputs(out_dir: &Path, set: &TrainingSet) -> Result<(), EngineError> {
    fs::create_dir_all(out_dir)?;
    write_json(&out_dir.join("training_set.json"), set)?;
    write_json(&out_dir.join("scaler.json"), &set.state)?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw: Vec<String> = std::env::args().collect();
    let args = parse_args(&raw);

    let set = build(&args).unwrap_or_else(|e| {
        eprintln!("feature-prep: {}", e);
        process::exit(2);
    });
    if let Err(e) = write_outputs(&args.out_dir, &set) {
        eprintln!("feature-prep: {}", e);
        process::exit(2);
    }

    println!(
        "{} rows ({} rejected), {:.1}% at risk, scaler {}",
        set.rows.len(),
        set.rejected.len(),
        set.at_risk_share() * 100.0,
        set.normalization_tag
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        std::iter::once("feature-prep")
            .chain(parts.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn limit_applies_to_preceding_query() {
        let args = parse_args(&argv(&[
            "raw.jsonl",
            "out",
            "--query",
            "language:python",
            "--limit",
            "300",
            "--query",
            "archived:true",
        ]));
        assert_eq!(args.input, PathBuf::from("raw.jsonl"));
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert_eq!(
            args.queries,
            vec![
                ("language:python".to_string(), 300),
                ("archived:true".to_string(), DEFAULT_LIMIT),
            ]
        );
    }

    #[test]
    fn now_is_parsed() {
        let args = parse_args(&argv(&["raw.jsonl", "out", "--now", "2025-06-01T00:00:00Z"]));
        assert_eq!(args.now.to_rfc3339(), "2025-06-01T00:00:00+00:00");
    }
}
