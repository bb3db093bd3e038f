// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed failure taxonomy for duration computation, project resolution and MR retrieval
// role: errors/taxonomy
// outputs: ReportError enum consumed by the assembler (recover locally) and main (render via anyhow)
// invariants:
// - record-level and project-level variants never abort the run on their own
// - every variant names the project or instants involved so the final report can list it
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
  /// Close instant precedes open instant; corrupt source data for one record.
  #[error("invalid interval: closed at {close_at} before opened at {open_at}")]
  InvalidInterval {
    open_at: DateTime<Utc>,
    close_at: DateTime<Utc>,
  },

  /// A record reached the calculator without a merge instant.
  #[error("merge request !{iid} has no merged_at")]
  MissingMergeInstant { iid: u64 },

  #[error("project not found: {input} ({reason})")]
  ProjectNotFound { input: String, reason: String },

  #[error("retrieval failed for project {project} at page {page} after {attempts} attempt(s): {reason}")]
  RetrievalFailed {
    project: u64,
    page: u32,
    attempts: u32,
    reason: String,
  },

  #[error("malformed page {page} for project {project}: {reason}")]
  MalformedPage {
    project: u64,
    page: u32,
    reason: String,
  },
}

impl ReportError {
  /// Record-level anomalies skip one row; everything else abandons a project.
  pub fn is_record_level(&self) -> bool {
    matches!(
      self,
      ReportError::InvalidInterval { .. } | ReportError::MissingMergeInstant { .. }
    )
  }
}
