// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Compute raw and business-hours open time between two instants
// role: metrics/business-hours
// inputs: open and close instants in any offset
// outputs: DurationPair (raw_hours, business_hours) as unrounded f64
// side_effects: None; independent of the system clock and local time zone
// invariants:
// - both instants are converted to UTC before any arithmetic
// - business window is Mon-Fri, [09:00, 17:00) UTC, fixed
// - iteration is one step per calendar day touched by the interval
// - 0 <= business_hours <= raw_hours
// errors: InvalidInterval when close precedes open
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::error::ReportError;
use crate::model::DurationPair;

pub const WORKDAY_START_HOUR: u32 = 9;
pub const WORKDAY_END_HOUR: u32 = 17;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Raw and business hours between `open_at` and `close_at`.
pub fn compute<A, B>(open_at: DateTime<A>, close_at: DateTime<B>) -> Result<DurationPair, ReportError>
where
  A: TimeZone,
  B: TimeZone,
{
  let open_at = open_at.with_timezone(&Utc);
  let close_at = close_at.with_timezone(&Utc);

  if close_at < open_at {
    return Err(ReportError::InvalidInterval { open_at, close_at });
  }

  Ok(DurationPair {
    raw_hours: hours(close_at - open_at),
    business_hours: business_hours_between(open_at, close_at),
  })
}

fn business_hours_between(open_at: DateTime<Utc>, close_at: DateTime<Utc>) -> f64 {
  let mut total = Duration::zero();
  let last_day = close_at.date_naive();
  let mut day = open_at.date_naive();

  while day <= last_day {
    if let Some((work_start, work_end)) = working_window(day) {
      let overlap_start = work_start.max(open_at);
      let overlap_end = work_end.min(close_at);

      if overlap_end > overlap_start {
        total += overlap_end - overlap_start;
      }
    }

    match day.succ_opt() {
      Some(next) => day = next,
      None => break,
    }
  }

  hours(total)
}

/// The day's working window as two instants, or None on weekends.
fn working_window(day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
  if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
    return None;
  }

  let start = NaiveTime::from_hms_opt(WORKDAY_START_HOUR, 0, 0)?;
  let end = NaiveTime::from_hms_opt(WORKDAY_END_HOUR, 0, 0)?;

  Some((day.and_time(start).and_utc(), day.and_time(end).and_utc()))
}

fn hours(d: Duration) -> f64 {
  match d.num_microseconds() {
    Some(us) => us as f64 / 1_000_000.0 / SECONDS_PER_HOUR,
    None => d.num_seconds() as f64 / SECONDS_PER_HOUR,
  }
}
