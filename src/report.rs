// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate resolution, retrieval and duration computation into detail rows and per-project summaries
// role: report/assembler
// inputs: project ids and paths; MergeRequestFilter; display zone for row timestamps
// outputs: ReportOutcome (rows, raw + business summaries, recorded failures)
// side_effects: HTTP through the client; warn/info logs for skipped projects and records
// invariants:
// - projects are processed deduplicated, in ascending id order
// - rows keep retrieval order end to end
// - a project failure keeps the rows already produced and moves on to the next project
// - a record-level failure skips that record only
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::business_hours;
use crate::error::ReportError;
use crate::gitlab::resolver::ProjectCache;
use crate::gitlab::{Clock, GitlabClient, MergeRequestFilter, ProjectResolver, Transport};
use crate::model::{DetailRow, DurationPair, MergeRecord, Metric, ProjectFailure, ProjectRef, RecordFailure, ReportOutcome, SummaryRow};
use crate::stats::{round2, summarize};
use crate::util::DisplayZone;

pub struct ReportAssembler<'a, T: Transport, C: Clock> {
  client: &'a GitlabClient<T, C>,
  filter: MergeRequestFilter,
  zone: DisplayZone,
  projects: ProjectCache,
}

impl<'a, T: Transport, C: Clock> ReportAssembler<'a, T, C> {
  pub fn new(client: &'a GitlabClient<T, C>, filter: MergeRequestFilter, zone: DisplayZone) -> Self {
    Self {
      client,
      filter,
      zone,
      projects: ProjectCache::default(),
    }
  }

  /// Resolve every input to a ProjectRef, deduplicated by id and sorted ascending.
  ///
  /// Paths that cannot be resolved are returned as failures; they never abort.
  pub fn resolve_projects(&self, ids: &[u64], paths: &[String]) -> (Vec<ProjectRef>, Vec<ProjectFailure>) {
    let resolver = ProjectResolver::new(self.client, &self.projects);
    let mut by_id: BTreeMap<u64, ProjectRef> = BTreeMap::new();
    let mut failures = Vec::new();

    for input in paths {
      match resolver.resolve(input) {
        Ok(p) => merge_ref(&mut by_id, p),
        Err(error) => {
          warn!(input = input.as_str(), %error, "skipping project");
          failures.push(ProjectFailure {
            project: input.clone(),
            error,
          });
        }
      }
    }

    for id in ids {
      merge_ref(&mut by_id, ProjectRef::from_id(*id));
    }

    let projects = by_id.into_values().map(|p| resolver.describe(p)).collect();
    (projects, failures)
  }

  /// Fetch, filter and measure every project's merged MRs.
  pub fn assemble(&self, projects: &[ProjectRef]) -> ReportOutcome {
    let mut out = ReportOutcome::default();

    for project in projects {
      info!(project = project.id, path = project.path.as_str(), "fetching merged MRs");

      let mut raw = Vec::new();
      let mut business = Vec::new();
      let mut pages = self.client.fetch_all(project.id, &self.filter);

      for item in pages.by_ref() {
        let record = match item {
          Ok(r) => r,
          Err(error) => {
            warn!(project = project.id, %error, "project retrieval stopped; keeping rows fetched so far");
            out.project_failures.push(ProjectFailure {
              project: project.path.clone(),
              error,
            });
            break;
          }
        };

        match measure(&record) {
          Ok((merged_at, d)) => {
            out.rows.push(self.detail_row(project, &record, merged_at, d));
            out.raw_hours.push(d.raw_hours);
            raw.push(d.raw_hours);
            business.push(d.business_hours);
          }
          Err(error) if error.is_record_level() => {
            warn!(project = project.id, iid = record.iid, %error, "skipping record");
            out.record_failures.push(RecordFailure {
              project_id: project.id,
              iid: record.iid,
              error,
            });
          }
          Err(error) => {
            warn!(project = project.id, iid = record.iid, %error, "abandoning project");
            out.project_failures.push(ProjectFailure {
              project: project.path.clone(),
              error,
            });
            break;
          }
        }
      }

      out.excluded += pages.excluded();
      info!(
        project = project.id,
        rows = raw.len(),
        excluded = pages.excluded(),
        outside_window = pages.outside_window(),
        "project done"
      );

      if !raw.is_empty() {
        out.raw_summary.push(summary_row(project, Metric::Raw, &raw));
        out.business_summary.push(summary_row(project, Metric::Business, &business));
      }
    }

    out
  }

  fn detail_row(&self, project: &ProjectRef, r: &MergeRecord, merged_at: DateTime<Utc>, d: DurationPair) -> DetailRow {
    DetailRow {
      project_id: project.id,
      project_path_with_namespace: project.path.clone(),
      iid: r.iid,
      title: r.title.clone(),
      author: r.author.label().to_string(),
      created_at: self.zone.format(r.created_at),
      merged_at: self.zone.format(merged_at),
      time_open_hours: round2(d.raw_hours),
      time_open_days: round2(d.raw_hours / 24.0),
      business_time_open_hours: round2(d.business_hours),
      business_time_open_days: round2(d.business_hours / 24.0),
      target_branch: r.target_branch.clone(),
      source_branch: r.source_branch.clone(),
      web_url: r.web_url.clone(),
    }
  }
}

fn merge_ref(by_id: &mut BTreeMap<u64, ProjectRef>, p: ProjectRef) {
  let named = by_id.get(&p.id).is_some_and(ProjectRef::has_display_path);
  if !named {
    by_id.insert(p.id, p);
  }
}

fn measure(r: &MergeRecord) -> Result<(DateTime<Utc>, DurationPair), ReportError> {
  let merged_at = r.merged_at.ok_or(ReportError::MissingMergeInstant { iid: r.iid })?;
  let d = business_hours::compute(r.created_at, merged_at)?;
  Ok((merged_at, d))
}

fn summary_row(project: &ProjectRef, metric: Metric, hours: &[f64]) -> SummaryRow {
  let s = summarize(hours);
  SummaryRow {
    project_id: project.id,
    project_path_with_namespace: project.path.clone(),
    metric,
    count: s.count,
    avg_hours: round2(s.avg),
    p50_hours: round2(s.p50),
    p90_hours: round2(s.p90),
    min_hours: round2(s.min),
    max_hours: round2(s.max),
  }
}
