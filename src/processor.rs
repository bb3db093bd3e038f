// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate one run: window, client, project resolution, assembly, files, console report
// role: processing/orchestrator
// inputs: EffectiveConfig; optional fixed now
// outputs: detail CSV, summary CSV, console report on stdout
// side_effects: HTTP to GitLab; writes two files; prints to stdout
// invariants:
// - configuration problems abort before any network call
// - project and record failures never abort; they are listed in the console report
// errors: anyhow with context for window, resolution and file writes
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cli::EffectiveConfig;
use crate::gitlab::{ClientConfig, GitlabClient, HttpTransport, MergeRequestFilter, RetryPolicy, SystemClock};
use crate::model::AuthorExclusions;
use crate::output;
use crate::report::ReportAssembler;
use crate::window::{self, DateWindow};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub fn summary_path(cfg: &EffectiveConfig, w: &DateWindow) -> PathBuf {
  cfg.summary_out.clone().unwrap_or_else(|| {
    PathBuf::from(format!(
      "review_duration_summary_{}_{}.csv",
      w.since_label(),
      w.until_label()
    ))
  })
}

pub fn run(cfg: &EffectiveConfig, now: DateTime<Utc>) -> Result<()> {
  if let Ok(json) = serde_json::to_string(cfg) {
    debug!(config = json.as_str(), "effective config");
  }

  let w = window::resolve_window(cfg.since.as_deref(), cfg.until.as_deref(), cfg.days, now)?;
  window::guard_window_size(&w, cfg.max_window_days, cfg.yes)?;
  info!(since = %w.since, until = %w.until, "date window (UTC)");

  let exclude = AuthorExclusions::new(&cfg.exclude_authors);
  if !exclude.is_empty() {
    info!(count = exclude.len(), "excluding authors");
  }

  let mut client_cfg = ClientConfig::new(&cfg.url);
  client_cfg.per_page = cfg.per_page;
  client_cfg.retry = RetryPolicy {
    max_attempts: cfg.max_attempts,
    ..RetryPolicy::default()
  };

  let transport = HttpTransport::new(cfg.token.clone(), HTTP_TIMEOUT);
  let client = GitlabClient::new(transport, SystemClock, client_cfg);
  let assembler = ReportAssembler::new(&client, MergeRequestFilter { window: w, exclude }, cfg.tz);

  let (projects, resolve_failures) = assembler.resolve_projects(&cfg.project_ids, &cfg.project_paths);
  if projects.is_empty() {
    bail!("no projects could be resolved");
  }
  info!(count = projects.len(), "projects to scan");

  let mut outcome = assembler.assemble(&projects);
  let mut failures = resolve_failures;
  failures.append(&mut outcome.project_failures);
  outcome.project_failures = failures;

  let summary = summary_path(cfg, &w);
  output::write_detail_file(&cfg.out, &outcome.rows).context("writing detail CSV")?;
  output::write_summary_file(&summary, &outcome.raw_summary, &outcome.business_summary)
    .context("writing summary CSV")?;

  if outcome.has_failures() {
    warn!(
      projects = outcome.project_failures.len(),
      records = outcome.record_failures.len(),
      "completed with failures"
    );
  }

  print!("{}", output::console_report(&outcome, &cfg.out, &summary));
  Ok(())
}
