//! Summary statistics over open-time hours.
//!
//! Percentiles interpolate linearly between the closest ranks; an empty
//! sample summarizes to all zeros.

use serde::Serialize;

/// Round to 2 decimals. Presentation only; arithmetic stays unrounded.
pub fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}

/// `p` in `[0, 1]` over an ascending slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
  match sorted.len() {
    0 => 0.0,
    1 => sorted[0],
    n => {
      let k = (n - 1) as f64 * p.clamp(0.0, 1.0);
      let lo = k.floor() as usize;
      let hi = k.ceil() as usize;
      if lo == hi {
        sorted[lo]
      } else {
        sorted[lo] * (hi as f64 - k) + sorted[hi] * (k - lo as f64)
      }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
  pub count: usize,
  pub avg: f64,
  pub p50: f64,
  pub p90: f64,
  pub min: f64,
  pub max: f64,
}

pub fn summarize(values: &[f64]) -> Summary {
  if values.is_empty() {
    return Summary::default();
  }

  let mut sorted = values.to_vec();
  sorted.sort_by(f64::total_cmp);
  let n = sorted.len();

  Summary {
    count: n,
    avg: sorted.iter().sum::<f64>() / n as f64,
    p50: percentile(&sorted, 0.5),
    p90: percentile(&sorted, 0.9),
    min: sorted[0],
    max: sorted[n - 1],
  }
}

// 2.0 -> "2.0", 2.25 -> "2.25"
fn short(x: f64) -> String {
  let r = round2(x);
  if r.fract() == 0.0 {
    format!("{r:.1}")
  } else {
    format!("{r}")
  }
}

/// `Xh (Yd)`, both rounded to 2 decimals.
pub fn hours_and_days(hours: f64) -> String {
  format!("{}h ({}d)", short(hours), short(hours / 24.0))
}

/// Console line body for `[stats overall]`.
pub fn overall_line(hours: &[f64]) -> String {
  if hours.is_empty() {
    return "No merged MRs found in the window.".to_string();
  }

  let s = summarize(hours);
  format!(
    "Count: {} | Avg: {} | P50: {} | P90: {}",
    s.count,
    hours_and_days(s.avg),
    hours_and_days(s.p50),
    hours_and_days(s.p90)
  )
}
