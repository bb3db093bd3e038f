// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Rate-limit quota bookkeeping, retry backoff policy and the clock seam used for every deliberate pause
// role: gitlab/pacing
// inputs: response headers (RateLimit-Remaining, RateLimit-Reset, Retry-After); injected Clock
// outputs: pause durations before the next request; backoff delays between retries
// side_effects: SystemClock::sleep blocks the calling thread
// invariants:
// - a single QuotaTracker is updated after every response, in request order
// - pause = max(0, reset - now) + buffer, only when remaining < threshold
// - once a pause has been taken the tracker forgets the stale quota
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use super::transport::HttpResponse;

pub const HEADER_REMAINING: &str = "ratelimit-remaining";
pub const HEADER_RESET: &str = "ratelimit-reset";
pub const HEADER_RETRY_AFTER: &str = "retry-after";

/// Time source and sleeper. Injected so pauses can be simulated in tests.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;
  fn sleep(&self, d: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn sleep(&self, d: Duration) {
    std::thread::sleep(d);
  }
}

/// Quota signals read from the most recent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitState {
  pub remaining: Option<u64>,
  pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
  pub fn from_response(resp: &HttpResponse) -> Self {
    let remaining = resp.header(HEADER_REMAINING).and_then(|v| v.trim().parse::<u64>().ok());
    let reset_at = resp
      .header(HEADER_RESET)
      .and_then(|v| v.trim().parse::<i64>().ok())
      .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    Self { remaining, reset_at }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
  /// Pause when fewer than this many requests remain.
  pub threshold: u64,
  /// Added on top of the time until reset.
  pub buffer: Duration,
  /// Used for a 429 that carries neither Retry-After nor a reset instant.
  pub fallback_wait: Duration,
  /// Consecutive 429 waits allowed for one request before giving up.
  pub max_throttle_waits: u32,
}

impl Default for RateLimitPolicy {
  fn default() -> Self {
    Self {
      threshold: 2,
      buffer: Duration::from_secs(1),
      fallback_wait: Duration::from_secs(60),
      max_throttle_waits: 10,
    }
  }
}

/// The single quota tracker shared by every request a client issues.
#[derive(Debug, Clone, Default)]
pub struct QuotaTracker {
  policy: RateLimitPolicy,
  state: RateLimitState,
}

impl QuotaTracker {
  pub fn new(policy: RateLimitPolicy) -> Self {
    Self {
      policy,
      state: RateLimitState::default(),
    }
  }

  pub fn state(&self) -> RateLimitState {
    self.state
  }

  pub fn observe(&mut self, resp: &HttpResponse) {
    self.state = RateLimitState::from_response(resp);
  }

  /// How long to pause before issuing the next request, if at all.
  pub fn pause_before_next(&self, now: DateTime<Utc>) -> Option<Duration> {
    let remaining = self.state.remaining?;

    if remaining >= self.policy.threshold {
      return None;
    }

    let reset_at = self.state.reset_at?;
    Some(until(reset_at, now) + self.policy.buffer)
  }

  /// Pause after an HTTP 429: Retry-After wins, then the reset instant.
  pub fn pause_after_throttle(&self, resp: &HttpResponse, now: DateTime<Utc>) -> Duration {
    if let Some(secs) = resp.header(HEADER_RETRY_AFTER).and_then(|v| v.trim().parse::<u64>().ok()) {
      return Duration::from_secs(secs) + self.policy.buffer;
    }

    match self.state.reset_at {
      Some(reset_at) => until(reset_at, now) + self.policy.buffer,
      None => self.policy.fallback_wait,
    }
  }

  /// Drop the quota snapshot once its reset has been waited out.
  pub fn clear(&mut self) {
    self.state = RateLimitState::default();
  }
}

fn until(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
  (reset_at - now).to_std().unwrap_or(Duration::ZERO)
}

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts per request, first try included.
  pub max_attempts: u32,
  pub base_delay: Duration,
  pub max_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 4,
      base_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(30),
    }
  }
}

impl RetryPolicy {
  /// Delay after the given failed attempt (1-based): base * 2^(attempt-1), capped.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let delay = self.base_delay.saturating_mul(1u32 << exp);
    delay.min(self.max_delay)
  }
}
