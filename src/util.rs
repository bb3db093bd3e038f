// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for logging setup, list files, display time zones and man page rendering
// role: utilities/helpers
// inputs: env (RUST_LOG); list file paths; zone names; clap CommandFactory
// outputs: initialized subscriber, trimmed list entries, formatted timestamps, man page text
// side_effects: init_tracing installs the global subscriber (first call wins)
// invariants:
// - display zones only relabel instants; arithmetic elsewhere stays UTC
// - list files skip blank lines and `#` comments
// errors: IO errors bubble with the offending path as context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use chrono_tz::Tz;
use clap::CommandFactory;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

/// Read a one-entry-per-line file; blank lines and `#` comments are skipped.
pub fn read_list_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
  let path = path.as_ref();
  let text = std::fs::read_to_string(path).with_context(|| format!("reading list file {}", path.display()))?;

  Ok(
    text
      .lines()
      .map(str::trim)
      .filter(|l| !l.is_empty() && !l.starts_with('#'))
      .map(str::to_string)
      .collect(),
  )
}

/// Zone used to label timestamps in output rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum DisplayZone {
  Utc,
  Local,
  Named(Tz),
}

impl DisplayZone {
  pub fn format(&self, t: DateTime<Utc>) -> String {
    match self {
      DisplayZone::Utc => t.to_rfc3339_opts(SecondsFormat::Secs, true),
      DisplayZone::Local => t.with_timezone(&Local).to_rfc3339_opts(SecondsFormat::Secs, true),
      DisplayZone::Named(tz) => t.with_timezone(tz).to_rfc3339_opts(SecondsFormat::Secs, true),
    }
  }
}

impl FromStr for DisplayZone {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") {
      return Ok(DisplayZone::Utc);
    }
    if s.eq_ignore_ascii_case("local") {
      return Ok(DisplayZone::Local);
    }
    s.parse::<Tz>()
      .map(DisplayZone::Named)
      .map_err(|_| format!("unknown time zone {s:?} (use utc, local, or an IANA name)"))
  }
}

impl fmt::Display for DisplayZone {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DisplayZone::Utc => f.write_str("utc"),
      DisplayZone::Local => f.write_str("local"),
      DisplayZone::Named(tz) => f.write_str(tz.name()),
    }
  }
}

impl From<DisplayZone> for String {
  fn from(z: DisplayZone) -> Self {
    z.to_string()
  }
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
