// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Write the detail CSV, the per-project summary CSV and the console report
// role: output/writers
// inputs: ReportOutcome; destination paths
// outputs: CSV files with a header row even when empty; console text
// side_effects: creates or truncates the destination files
// invariants:
// - column order is fixed by DETAIL_HEADERS / SUMMARY_HEADERS and matches the row structs
// - summary rows are grouped per project: raw first, then business
// errors: IO and CSV errors bubble with the destination path as context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{DetailRow, ReportOutcome, SummaryRow};
use crate::stats::overall_line;

pub const DETAIL_HEADERS: [&str; 14] = [
  "project_id",
  "project_path_with_namespace",
  "iid",
  "title",
  "author",
  "created_at",
  "merged_at",
  "time_open_hours",
  "time_open_days",
  "business_time_open_hours",
  "business_time_open_days",
  "target_branch",
  "source_branch",
  "web_url",
];

pub const SUMMARY_HEADERS: [&str; 9] = [
  "project_id",
  "project_path_with_namespace",
  "metric",
  "count",
  "avg_hours",
  "p50_hours",
  "p90_hours",
  "min_hours",
  "max_hours",
];

fn write_csv<W: Write, R: serde::Serialize>(dest: W, headers: &[&str], rows: &[&R]) -> Result<()> {
  let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(dest);
  w.write_record(headers)?;
  for r in rows {
    w.serialize(r)?;
  }
  w.flush()?;
  Ok(())
}

pub fn write_detail<W: Write>(dest: W, rows: &[DetailRow]) -> Result<()> {
  let refs: Vec<&DetailRow> = rows.iter().collect();
  write_csv(dest, &DETAIL_HEADERS, &refs)
}

/// Raw and business rows for the same project are written next to each other.
pub fn write_summary<W: Write>(dest: W, raw: &[SummaryRow], business: &[SummaryRow]) -> Result<()> {
  let mut rows: Vec<&SummaryRow> = Vec::with_capacity(raw.len() + business.len());
  for r in raw {
    rows.push(r);
    rows.extend(business.iter().filter(|b| b.project_id == r.project_id));
  }
  write_csv(dest, &SUMMARY_HEADERS, &rows)
}

pub fn write_detail_file(path: &Path, rows: &[DetailRow]) -> Result<()> {
  let f = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
  write_detail(f, rows).with_context(|| format!("writing {}", path.display()))
}

pub fn write_summary_file(path: &Path, raw: &[SummaryRow], business: &[SummaryRow]) -> Result<()> {
  let f = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
  write_summary(f, raw, business).with_context(|| format!("writing {}", path.display()))
}

/// Console summary printed after both files are written.
pub fn console_report(outcome: &ReportOutcome, detail: &Path, summary: &Path) -> String {
  let mut s = String::new();
  let _ = writeln!(s, "[done] Wrote {} rows to {}", outcome.rows.len(), detail.display());
  let _ = writeln!(s, "[done] Wrote per-project summary to {}", summary.display());
  if outcome.excluded > 0 {
    let _ = writeln!(s, "[info] Excluded {} MR(s) by author", outcome.excluded);
  }
  let _ = writeln!(s, "[stats overall] {}", overall_line(&outcome.raw_hours));

  if outcome.has_failures() {
    let _ = writeln!(
      s,
      "[failures] {} project(s), {} record(s)",
      outcome.project_failures.len(),
      outcome.record_failures.len()
    );
    for f in &outcome.project_failures {
      let _ = writeln!(s, "  project {}: {}", f.project, f.error);
    }
    for f in &outcome.record_failures {
      let _ = writeln!(s, "  project {} !{}: {}", f.project_id, f.iid, f.error);
    }
  }

  s
}
