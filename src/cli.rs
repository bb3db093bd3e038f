use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use crate::util::{self, DisplayZone};

#[derive(Parser, Debug)]
#[command(
    name = "review-duration",
    version,
    about = "Export merged GitLab MRs with raw and business-hours open time (CSV)",
    long_about = None
)]
pub struct Cli {
  /// GitLab base URL
  #[arg(long, env = "GITLAB_URL", default_value = "https://gitlab.com")]
  pub url: String,

  /// Personal access token (read_api scope)
  #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
  pub token: Option<String>,

  /// Numeric project ids
  #[arg(long, num_args = 1..)]
  pub projects: Vec<u64>,

  /// Project paths or full URLs, e.g. group/sub/app
  #[arg(long = "project-paths", num_args = 1..)]
  pub project_paths: Vec<String>,

  /// File with one project path or URL per line (`#` comments allowed)
  #[arg(long = "project-paths-file")]
  pub project_paths_file: Option<PathBuf>,

  /// Window length in days when --since is not given
  #[arg(long, env = "DAYS_BACK", default_value_t = 14)]
  pub days: u32,

  /// Start of the window: YYYY-MM-DD, RFC3339, or a phrase like "last monday"
  #[arg(long)]
  pub since: Option<String>,

  /// End of the window (inclusive); same formats as --since
  #[arg(long)]
  pub until: Option<String>,

  /// Windows longer than this many days require --yes
  #[arg(long = "max-window-days", default_value_t = 30)]
  pub max_window_days: u32,

  /// Confirm a large window without prompting
  #[arg(long, short = 'y')]
  pub yes: bool,

  /// Detail CSV path
  #[arg(long, default_value = "gitlab_merged_mrs.csv")]
  pub out: PathBuf,

  /// Summary CSV path (default: review_duration_summary_<since>_<until>.csv)
  #[arg(long = "summary-out")]
  pub summary_out: Option<PathBuf>,

  /// Exclude MRs by this author (username or display name); repeatable
  #[arg(long = "exclude-author")]
  pub exclude_author: Vec<String>,

  /// File with one author per line to exclude
  #[arg(long = "exclude-authors-file")]
  pub exclude_authors_file: Option<PathBuf>,

  /// Page size for MR listing
  #[arg(long = "per-page", default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=100))]
  pub per_page: u32,

  /// Attempts per page request before giving up on a project
  #[arg(long = "max-attempts", default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
  pub max_attempts: u32,

  /// Time zone for timestamps in rows: utc, local, or an IANA name (label only)
  #[arg(long, default_value = "utc")]
  pub tz: DisplayZone,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant for window defaults (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
  pub url: String,
  #[serde(skip)]
  pub token: String,
  pub project_ids: Vec<u64>,
  pub project_paths: Vec<String>,
  pub days: u32,
  pub since: Option<String>,
  pub until: Option<String>,
  pub max_window_days: u32,
  pub yes: bool,
  pub out: PathBuf,
  pub summary_out: Option<PathBuf>,
  pub exclude_authors: Vec<String>,
  pub per_page: u32,
  pub max_attempts: u32,
  pub tz: DisplayZone,
  pub now_override: Option<String>,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let token = match cli.token.as_deref().map(str::trim) {
    Some(t) if !t.is_empty() => t.to_string(),
    _ => bail!("missing token: pass --token or set GITLAB_TOKEN"),
  };

  let mut project_paths: Vec<String> = cli
    .project_paths
    .iter()
    .map(|p| p.trim().to_string())
    .filter(|p| !p.is_empty())
    .collect();
  if let Some(file) = &cli.project_paths_file {
    project_paths.extend(util::read_list_file(file)?);
  }

  if cli.projects.is_empty() && project_paths.is_empty() {
    bail!("no projects: pass --projects, --project-paths or --project-paths-file");
  }

  let mut exclude_authors = cli.exclude_author.clone();
  if let Some(file) = &cli.exclude_authors_file {
    exclude_authors.extend(util::read_list_file(file)?);
  }

  Ok(EffectiveConfig {
    url: cli.url.trim().trim_end_matches('/').to_string(),
    token,
    project_ids: cli.projects,
    project_paths,
    days: cli.days,
    since: cli.since,
    until: cli.until,
    max_window_days: cli.max_window_days,
    yes: cli.yes,
    out: cli.out,
    summary_out: cli.summary_out,
    exclude_authors,
    per_page: cli.per_page,
    max_attempts: cli.max_attempts,
    tz: cli.tz,
    now_override: cli.now_override,
  })
}
