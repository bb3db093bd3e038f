use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_english::{parse_date_string, Dialect};
use serde::Serialize;

// Date-window resolution for --since/--until/--days; everything is UTC.

/// Inclusive UTC window applied to `merged_at`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateWindow {
  pub since: DateTime<Utc>,
  pub until: DateTime<Utc>,
}

impl DateWindow {
  /// Whole calendar days: `since` at 00:00:00, `until` at 23:59:59.
  pub fn from_dates(since: NaiveDate, until: NaiveDate) -> Self {
    Self {
      since: start_of(since),
      until: end_of(until),
    }
  }

  pub fn contains(&self, t: DateTime<Utc>) -> bool {
    self.since <= t && t <= self.until
  }

  pub fn span_days(&self) -> f64 {
    (self.until - self.since).num_seconds() as f64 / 86_400.0
  }

  pub fn since_label(&self) -> String {
    self.since.format("%Y-%m-%d").to_string()
  }

  pub fn until_label(&self) -> String {
    self.until.format("%Y-%m-%d").to_string()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
  Start,
  End,
}

fn start_of(d: NaiveDate) -> DateTime<Utc> {
  d.and_time(NaiveTime::MIN).and_utc()
}

fn end_of(d: NaiveDate) -> DateTime<Utc> {
  let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
  d.and_time(last).and_utc()
}

/// Parse a user-supplied date into a UTC instant.
///
/// Accepts `YYYY-MM-DD` (snapped to the start or end of that UTC day per `bound`),
/// RFC3339 with any offset, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC), or an
/// English phrase such as "last monday" resolved against `now`. An end-bound
/// phrase covers the whole day it names, like a plain date does.
pub fn parse_user_instant(raw: &str, bound: Bound, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
  let s = raw.trim();

  if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    return Ok(match bound {
      Bound::Start => start_of(d),
      Bound::End => end_of(d),
    });
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }

  if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
    return Ok(ndt.and_utc());
  }

  let dt = parse_date_string(s, now, Dialect::Uk).map_err(|e| anyhow::anyhow!("unrecognized date {:?}: {}", raw, e))?;
  Ok(match bound {
    Bound::Start => dt,
    Bound::End => end_of(dt.date_naive()),
  })
}

/// Parse a `--now-override` string. Accepts RFC3339 or a naive UTC timestamp.
pub fn parse_now_override(s: Option<&str>) -> Option<DateTime<Utc>> {
  s.and_then(|raw| {
    DateTime::parse_from_rfc3339(raw)
      .ok()
      .map(|dt| dt.with_timezone(&Utc))
      .or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
          .ok()
          .map(|ndt| ndt.and_utc())
      })
  })
}

/// Resolve the effective window.
///
/// `since` defaults to `now - days_back`, `until` to `now`.
pub fn resolve_window(
  since: Option<&str>,
  until: Option<&str>,
  days_back: u32,
  now: DateTime<Utc>,
) -> Result<DateWindow> {
  let since_dt = match since {
    Some(s) => parse_user_instant(s, Bound::Start, now).context("parsing --since")?,
    None => now - Duration::days(i64::from(days_back)),
  };

  let until_dt = match until {
    Some(u) => parse_user_instant(u, Bound::End, now).context("parsing --until")?,
    None => now,
  };

  if until_dt < since_dt {
    bail!("until date is before since date");
  }

  Ok(DateWindow {
    since: since_dt,
    until: until_dt,
  })
}

/// Refuse oversized windows unless explicitly confirmed.
pub fn guard_window_size(window: &DateWindow, max_days: u32, confirmed: bool) -> Result<()> {
  let days = window.span_days();

  if days <= f64::from(max_days) {
    return Ok(());
  }

  tracing::warn!(
    days,
    max_days,
    "date range is large; this may query many merge requests and load the API"
  );

  if !confirmed {
    bail!(
      "date range is {:.1} days (> {}); pass --yes to continue",
      days,
      max_days
    );
  }

  Ok(())
}
