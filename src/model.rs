// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define merge-request records, duration pairs, project refs and the CSV row shapes shared by retrieval, assembly and output
// role: model/types
// outputs: Plain structs; serde shapes for GitLab payloads (in) and CSV rows (out)
// invariants:
// - MergeRecord is immutable after construction from a page
// - DurationPair: 0 <= business_hours <= raw_hours
// - CSV field order is the declaration order of DetailRow / SummaryRow
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
  pub username: String,
  pub name: String,
}

impl Author {
  /// Label used in output rows: username, or display name when the username is empty.
  pub fn label(&self) -> &str {
    if self.username.is_empty() {
      &self.name
    } else {
      &self.username
    }
  }
}

/// One merged change, as retrieved from the projects API.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRecord {
  pub project_id: u64,
  pub iid: u64,
  pub title: String,
  pub author: Author,
  pub created_at: DateTime<Utc>,
  pub merged_at: Option<DateTime<Utc>>,
  pub target_branch: String,
  pub source_branch: String,
  pub web_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DurationPair {
  pub raw_hours: f64,
  pub business_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectRef {
  pub id: u64,
  /// `path_with_namespace`; the id rendered as text until a lookup fills it.
  pub path: String,
}

impl ProjectRef {
  pub fn from_id(id: u64) -> Self {
    Self { id, path: id.to_string() }
  }

  pub fn has_display_path(&self) -> bool {
    self.path != self.id.to_string()
  }
}

/// Authors excluded from the report. Exact, case-sensitive match against
/// either the username or the display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorExclusions {
  names: BTreeSet<String>,
}

impl AuthorExclusions {
  pub fn new<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let names = names
      .into_iter()
      .map(|s| s.as_ref().trim().to_string())
      .filter(|s| !s.is_empty())
      .collect();
    Self { names }
  }

  pub fn excludes(&self, author: &Author) -> bool {
    self.names.contains(author.username.trim()) || self.names.contains(author.name.trim())
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

// --- GitLab payloads (only the fields this tool reads) ---

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAuthor {
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMergeRequest {
  pub iid: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub author: Option<ApiAuthor>,
  pub created_at: String,
  #[serde(default)]
  pub merged_at: Option<String>,
  #[serde(default)]
  pub target_branch: Option<String>,
  #[serde(default)]
  pub source_branch: Option<String>,
  #[serde(default)]
  pub web_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiProject {
  pub id: u64,
  #[serde(default)]
  pub path_with_namespace: Option<String>,
}

// --- Output rows ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
  pub project_id: u64,
  pub project_path_with_namespace: String,
  pub iid: u64,
  pub title: String,
  pub author: String,
  pub created_at: String,
  pub merged_at: String,
  pub time_open_hours: f64,
  pub time_open_days: f64,
  pub business_time_open_hours: f64,
  pub business_time_open_days: f64,
  pub target_branch: String,
  pub source_branch: String,
  pub web_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
  Raw,
  Business,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
  pub project_id: u64,
  pub project_path_with_namespace: String,
  pub metric: Metric,
  pub count: usize,
  pub avg_hours: f64,
  pub p50_hours: f64,
  pub p90_hours: f64,
  pub min_hours: f64,
  pub max_hours: f64,
}

// --- Failures recorded instead of aborting ---

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFailure {
  /// Raw user input or resolved path, whichever identifies the project best.
  pub project: String,
  pub error: ReportError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
  pub project_id: u64,
  pub iid: u64,
  pub error: ReportError,
}

#[derive(Debug, Clone, Default)]
pub struct ReportOutcome {
  pub rows: Vec<DetailRow>,
  pub raw_summary: Vec<SummaryRow>,
  pub business_summary: Vec<SummaryRow>,
  pub project_failures: Vec<ProjectFailure>,
  pub record_failures: Vec<RecordFailure>,
  pub excluded: usize,
  /// Unrounded raw hours of every row, in row order.
  pub raw_hours: Vec<f64>,
}

impl ReportOutcome {
  pub fn has_failures(&self) -> bool {
    !self.project_failures.is_empty() || !self.record_failures.is_empty()
  }
}
