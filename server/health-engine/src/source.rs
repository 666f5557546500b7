//! Repository metadata sources and multi-query collection.

use std::collections::HashSet;
use std::io::BufRead;

use crate::error::EngineError;
use crate::types::RepositorySnapshot;

/// Anything that can answer a repository search. Implementations own paging
/// and rate limiting; errors are surfaced to the caller as `UpstreamFetch`.
pub trait MetadataSource {
  fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RepositorySnapshot>, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
  Gt(u64),
  Ge(u64),
  Lt(u64),
  Le(u64),
  Eq(u64),
}

impl Bound {
  fn parse(raw: &str) -> Option<Self> {
    let (ctor, digits): (fn(u64) -> Bound, &str) = if let Some(r) = raw.strip_prefix(">=") {
      (Bound::Ge, r)
    } else if let Some(r) = raw.strip_prefix("<=") {
      (Bound::Le, r)
    } else if let Some(r) = raw.strip_prefix('>') {
      (Bound::Gt, r)
    } else if let Some(r) = raw.strip_prefix('<') {
      (Bound::Lt, r)
    } else {
      (Bound::Eq, raw)
    };
    digits.parse().ok().map(ctor)
  }

  fn accepts(self, v: u64) -> bool {
    match self {
      Bound::Gt(n) => v > n,
      Bound::Ge(n) => v >= n,
      Bound::Lt(n) => v < n,
      Bound::Le(n) => v <= n,
      Bound::Eq(n) => v == n,
    }
  }
}

/// Parsed search query: `language:`, `stars:`, `archived:` qualifiers plus free text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
  language: Option<String>,
  stars: Option<Bound>,
  archived: Option<bool>,
  terms: Vec<String>,
}

impl SearchQuery {
  pub fn parse(query: &str) -> Result<Self, EngineError> {
    let mut q = SearchQuery::default();
    for token in query.split_whitespace() {
      match token.split_once(':') {
        Some(("language", v)) => q.language = Some(v.to_ascii_lowercase()),
        Some(("stars", v)) => {
          q.stars = Some(
            Bound::parse(v)
              .ok_or_else(|| EngineError::validation("query", &format!("invalid stars qualifier: {}", v)))?,
          )
        }
        Some(("archived", v)) => {
          q.archived = Some(match v {
            "true" => true,
            "false" => false,
            _ => {
              return Err(EngineError::validation(
                "query",
                &format!("archived must be true|false, got {}", v),
              ))
            }
          })
        }
        _ => q.terms.push(token.to_ascii_lowercase()),
      }
    }
    Ok(q)
  }

  pub fn matches(&self, s: &RepositorySnapshot) -> bool {
    if let Some(lang) = &self.language {
      let repo_lang = s.language.as_deref().map(str::to_ascii_lowercase);
      if repo_lang.as_deref() != Some(lang.as_str()) {
        return false;
      }
    }
    if let Some(bound) = self.stars {
      if !bound.accepts(s.stars) {
        return false;
      }
    }
    if let Some(archived) = self.archived {
      if s.is_archived != archived {
        return false;
      }
    }
    let haystack = format!(
      "{} {}",
      s.full_name.to_ascii_lowercase(),
      s.description.as_deref().unwrap_or("").to_ascii_lowercase()
    );
    self.terms.iter().all(|t| haystack.contains(t))
  }
}

/// Snapshots exported as JSON lines, searchable in file order.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFile {
  snapshots: Vec<RepositorySnapshot>,
}

impl SnapshotFile {
  pub fn new(snapshots: Vec<RepositorySnapshot>) -> Self {
    Self { snapshots }
  }

  /// Parse one snapshot per non-blank line. A bad line fails the whole load
  /// with its 1-based line number.
  pub fn from_reader(reader: impl BufRead) -> Result<Self, EngineError> {
    let mut snapshots = Vec::new();
    for (i, line) in reader.lines().enumerate() {
      let line = line?;
      let trimmed = line.trim();
      if trimmed.is_empty() {
        continue;
      }
      let snap: RepositorySnapshot = serde_json::from_str(trimmed)
        .map_err(|e| EngineError::validation(&format!("line {}", i + 1), &e.to_string()))?;
      snapshots.push(snap);
    }
    Ok(Self { snapshots })
  }

  pub fn len(&self) -> usize {
    self.snapshots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.snapshots.is_empty()
  }

  pub fn snapshots(&self) -> &[RepositorySnapshot] {
    &self.snapshots
  }
}

impl MetadataSource for SnapshotFile {
  fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RepositorySnapshot>, EngineError> {
    let q = SearchQuery::parse(query)?;
    Ok(
      self
        .snapshots
        .iter()
        .filter(|s| q.matches(s))
        .take(limit)
        .cloned()
        .collect(),
    )
  }
}

/// Run every `(query, limit)` against the source, keeping the first snapshot
/// seen for each `full_name`. Fetch errors are returned as-is, not retried.
pub fn collect(
  source: &dyn MetadataSource,
  queries: &[(String, usize)],
) -> Result<Vec<RepositorySnapshot>, EngineError> {
  let mut seen = HashSet::new();
  let mut out = Vec::new();
  for (query, limit) in queries {
    let batch = source.fetch(query, *limit)?;
    let before = out.len();
    for snap in batch {
      if seen.insert(snap.full_name.clone()) {
        out.push(snap);
      }
    }
    log::info!("query {:?}: {} new repositories", query, out.len() - before);
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn snap(name: &str, lang: &str, stars: u64, archived: bool) -> RepositorySnapshot {
    RepositorySnapshot {
      repo_id: None,
      full_name: name.into(),
      language: Some(lang.into()),
      stars,
      forks: 0,
      watchers: stars,
      open_issues: 0,
      is_archived: archived,
      created_at: None,
      updated_at: None,
      pushed_at: None,
      description: Some("A web framework".into()),
    }
  }

  fn file() -> SnapshotFile {
    SnapshotFile::new(vec![
      snap("a/flask", "Python", 900, false),
      snap("b/express", "JavaScript", 600, false),
      snap("c/old", "Python", 150, true),
      snap("d/tiny", "Python", 20, false),
    ])
  }

  struct Failing;

  impl MetadataSource for Failing {
    fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<RepositorySnapshot>, EngineError> {
      Err(EngineError::upstream("403 rate limited"))
    }
  }

  #[test]
  fn qualifiers_filter() {
    let got = file().fetch("language:python stars:>500", 10).unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].full_name, "a/flask");

    let got = file().fetch("archived:true stars:>=100", 10).unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].full_name, "c/old");
  }

  #[test]
  fn free_text_matches_name_or_description() {
    assert_eq!(file().fetch("EXPRESS", 10).unwrap().len(), 1);
    assert_eq!(file().fetch("framework", 10).unwrap().len(), 4);
  }

  #[test]
  fn limit_is_respected() {
    assert_eq!(file().fetch("language:python", 2).unwrap().len(), 2);
  }

  #[test]
  fn bad_qualifier_rejected() {
    assert!(file().fetch("stars:lots", 10).is_err());
    assert!(file().fetch("archived:maybe", 10).is_err());
  }

  #[test]
  fn collect_dedups_across_queries() {
    let queries = vec![
      ("language:python".to_string(), 10),
      ("stars:>100".to_string(), 10),
    ];
    let got = collect(&file(), &queries).unwrap();
    let names: Vec<_> = got.iter().map(|s| s.full_name.as_str()).collect();
    assert_eq!(names, vec!["a/flask", "c/old", "d/tiny", "b/express"]);
  }

  #[test]
  fn collect_surfaces_upstream_error() {
    let err = collect(&Failing, &[("x".to_string(), 1)]).unwrap_err();
    assert!(matches!(err, EngineError::UpstreamFetch(_)));
    assert!(err.to_string().contains("403 rate limited"));
  }

  #[test]
  fn reader_reports_bad_line() {
    let input = "\n{\"full_name\":\"a/b\",\"stars\":1,\"forks\":0,\"watchers\":1,\"open_issues\":0}\nnot json\n";
    let err = SnapshotFile::from_reader(input.as_bytes()).unwrap_err();
    assert_eq!(err.field(), Some("line 3"));
  }
}
