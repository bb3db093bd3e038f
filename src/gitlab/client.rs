// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Rate-limit-aware, retrying, paginated retrieval of merged MRs for one project at a time
// role: gitlab/client
// inputs: project id, MergeRequestFilter (window, author exclusions); ClientConfig (base URL, page size, policies)
// outputs: Lazy iterator of Result<MergeRecord, ReportError> in API return order; project lookups
// side_effects: HTTP via Transport; pauses via Clock (rate-limit waits, retry backoff)
// invariants:
// - pages are requested sequentially; page N+1 only after page N was fully parsed
// - a page that fails to parse ends the fetch with MalformedPage; nothing is skipped
// - a 429 waits and re-issues the same request without spending a retry attempt,
//   at most max_throttle_waits times per request
// - a low quota seen on any response, failed ones included, is waited out before the next request
// - transport errors and 5xx retry with backoff up to max_attempts total attempts
// - after Done or Failed the iterator yields None forever
// errors: RetrievalFailed / MalformedPage, carrying project id and page
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::rate_limit::{Clock, QuotaTracker, RateLimitPolicy, RetryPolicy};
use super::transport::{HttpResponse, Transport};
use crate::error::ReportError;
use crate::model::{ApiMergeRequest, ApiProject, Author, AuthorExclusions, MergeRecord};
use crate::window::DateWindow;

pub const DEFAULT_PER_PAGE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub base_url: String,
  pub per_page: u32,
  pub retry: RetryPolicy,
  pub rate_limit: RateLimitPolicy,
}

impl ClientConfig {
  pub fn new(base_url: &str) -> Self {
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      per_page: DEFAULT_PER_PAGE,
      retry: RetryPolicy::default(),
      rate_limit: RateLimitPolicy::default(),
    }
  }

  fn api(&self, rest: &str) -> String {
    format!("{}/api/v4/{}", self.base_url, rest)
  }
}

/// Filters applied to one project's fetch.
#[derive(Debug, Clone)]
pub struct MergeRequestFilter {
  pub window: DateWindow,
  pub exclude: AuthorExclusions,
}

/// Why a single request gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
  #[error("gave up after {attempts} attempt(s): {reason}")]
  Exhausted { attempts: u32, reason: String },
  #[error("HTTP {status}")]
  Rejected { status: u16, attempts: u32 },
  #[error("malformed response: {reason}")]
  Malformed { reason: String },
}

impl RequestError {
  pub fn attempts(&self) -> u32 {
    match self {
      RequestError::Exhausted { attempts, .. } | RequestError::Rejected { attempts, .. } => *attempts,
      // the payload arrived; only its content was bad
      RequestError::Malformed { .. } => 1,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, RequestError::Rejected { status: 404, .. })
  }
}

// Per-request states. Page-level states live in FetchState below.
enum RequestState {
  Requesting { attempt: u32 },
  Waiting { attempt: u32, pause: Duration },
  Retrying { attempt: u32, delay: Duration, reason: String },
}

pub struct GitlabClient<T: Transport, C: Clock> {
  transport: T,
  clock: C,
  config: ClientConfig,
  quota: RefCell<QuotaTracker>,
}

impl<T: Transport, C: Clock> GitlabClient<T, C> {
  pub fn new(transport: T, clock: C, config: ClientConfig) -> Self {
    let quota = RefCell::new(QuotaTracker::new(config.rate_limit));
    Self {
      transport,
      clock,
      config,
      quota,
    }
  }

  #[cfg(test)]
  pub fn clock(&self) -> &C {
    &self.clock
  }

  #[cfg(test)]
  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// All merged MRs for `project` matching `filter`, lazily, page by page.
  pub fn fetch_all<'a>(&'a self, project: u64, filter: &'a MergeRequestFilter) -> MergeRequestPages<'a, T, C> {
    MergeRequestPages {
      client: self,
      project,
      filter,
      state: FetchState::Idle,
      excluded: 0,
      outside_window: 0,
    }
  }

  /// `GET /projects/:id_or_path`; paths are URL-encoded.
  pub fn project(&self, id_or_path: &str) -> Result<ApiProject, RequestError> {
    let url = self.config.api(&format!("projects/{}", urlencoding::encode(id_or_path)));
    let resp = self.execute(&url, &[])?;

    serde_json::from_str::<ApiProject>(&resp.body).map_err(|e| RequestError::Malformed {
      reason: format!("unparseable project payload: {e}"),
    })
  }

  /// Issue one GET, honoring the quota and retrying transient failures.
  fn execute(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, RequestError> {
    let max_attempts = self.config.retry.max_attempts.max(1);
    let max_throttle_waits = self.config.rate_limit.max_throttle_waits;
    let mut throttle_waits = 0u32;

    let mut state = match self.quota_pause() {
      Some(pause) => RequestState::Waiting { attempt: 1, pause },
      None => RequestState::Requesting { attempt: 1 },
    };

    loop {
      state = match state {
        RequestState::Requesting { attempt } => {
          debug!(url, attempt, "GET");
          match self.transport.get(url, query) {
            Err(e) => self.after_failure(attempt, max_attempts, e.to_string())?,
            Ok(resp) => {
              self.quota.borrow_mut().observe(&resp);

              if resp.is_throttled() {
                if throttle_waits >= max_throttle_waits {
                  return Err(RequestError::Exhausted {
                    attempts: attempt,
                    reason: format!("still throttled (HTTP 429) after {throttle_waits} wait(s)"),
                  });
                }
                throttle_waits += 1;
                let pause = self.quota.borrow().pause_after_throttle(&resp, self.clock.now());
                RequestState::Waiting { attempt, pause }
              } else if resp.is_server_error() {
                self.after_failure(attempt, max_attempts, format!("HTTP {}", resp.status))?
              } else if !resp.is_success() {
                return Err(RequestError::Rejected {
                  status: resp.status,
                  attempts: attempt,
                });
              } else {
                return Ok(resp);
              }
            }
          }
        }
        RequestState::Waiting { attempt, pause } => {
          let remaining = self.quota.borrow().state().remaining;
          info!(wait_secs = pause.as_secs_f64(), ?remaining, "[rate-limit] sleeping until quota resets");
          self.clock.sleep(pause);
          self.quota.borrow_mut().clear();
          info!("[rate-limit] resuming");
          RequestState::Requesting { attempt }
        }
        RequestState::Retrying { attempt, delay, reason } => {
          warn!(
            attempt,
            max_attempts,
            delay_secs = delay.as_secs_f64(),
            reason = reason.as_str(),
            "request failed, retrying"
          );
          match self.quota_pause() {
            Some(pause) if pause > delay => RequestState::Waiting { attempt: attempt + 1, pause },
            _ => {
              self.clock.sleep(delay);
              RequestState::Requesting { attempt: attempt + 1 }
            }
          }
        }
      };
    }
  }

  fn quota_pause(&self) -> Option<Duration> {
    self.quota.borrow().pause_before_next(self.clock.now())
  }

  fn after_failure(&self, attempt: u32, max_attempts: u32, reason: String) -> Result<RequestState, RequestError> {
    if attempt >= max_attempts {
      return Err(RequestError::Exhausted {
        attempts: attempt,
        reason,
      });
    }

    Ok(RequestState::Retrying {
      attempt,
      delay: self.config.retry.delay_after(attempt),
      reason,
    })
  }

  fn fetch_page(&self, project: u64, page: u32, filter: &MergeRequestFilter) -> Result<Page, ReportError> {
    let url = self.config.api(&format!("projects/{project}/merge_requests"));
    let per_page = self.config.per_page.max(1);
    let query = vec![
      ("state".to_string(), "merged".to_string()),
      ("scope".to_string(), "all".to_string()),
      ("order_by".to_string(), "updated_at".to_string()),
      ("sort".to_string(), "desc".to_string()),
      ("updated_after".to_string(), iso_utc(filter.window.since)),
      ("per_page".to_string(), per_page.to_string()),
      ("page".to_string(), page.to_string()),
    ];

    let resp = self.execute(&url, &query).map_err(|e| ReportError::RetrievalFailed {
      project,
      page,
      attempts: e.attempts(),
      reason: e.to_string(),
    })?;

    let malformed = |reason: String| ReportError::MalformedPage { project, page, reason };

    let items: Vec<ApiMergeRequest> = serde_json::from_str(&resp.body).map_err(|e| malformed(e.to_string()))?;
    let fetched = items.len();

    let records = items
      .into_iter()
      .map(|mr| to_record(project, mr).map_err(&malformed))
      .collect::<Result<Vec<_>, _>>()?;

    let next_page = if fetched < per_page as usize || !has_next_page(&resp) {
      None
    } else {
      Some(page + 1)
    };

    debug!(project, page, fetched, ?next_page, "page parsed");

    Ok(Page { records, next_page })
  }
}

struct Page {
  records: Vec<MergeRecord>,
  next_page: Option<u32>,
}

/// Explicit "no more pages" signals. Absent headers mean "keep going".
fn has_next_page(resp: &HttpResponse) -> bool {
  if let Some(next) = resp.header("x-next-page") {
    return !next.trim().is_empty();
  }

  if let Some(link) = resp.header("link") {
    return link.split(',').any(|part| part.contains("rel=\"next\""));
  }

  true
}

fn iso_utc(t: DateTime<Utc>) -> String {
  t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn parse_instant(field: &str, raw: &str) -> Result<DateTime<Utc>, String> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| format!("{field} {raw:?}: {e}"))
}

fn to_record(project: u64, mr: ApiMergeRequest) -> Result<MergeRecord, String> {
  let created_at = parse_instant("created_at", &mr.created_at)?;
  let merged_at = match mr.merged_at.as_deref() {
    Some(raw) => Some(parse_instant("merged_at", raw)?),
    None => None,
  };

  let author = mr
    .author
    .map(|a| Author {
      username: a.username.unwrap_or_default().trim().to_string(),
      name: a.name.unwrap_or_default().trim().to_string(),
    })
    .unwrap_or_default();

  Ok(MergeRecord {
    project_id: project,
    iid: mr.iid,
    title: mr.title,
    author,
    created_at,
    merged_at,
    target_branch: mr.target_branch.unwrap_or_default(),
    source_branch: mr.source_branch.unwrap_or_default(),
    web_url: mr.web_url.unwrap_or_default(),
  })
}

enum FetchState {
  Idle,
  Requesting { page: u32 },
  Yielding { records: VecDeque<MergeRecord>, next_page: Option<u32> },
  Done,
  Failed,
}

/// Lazy, finite stream of one project's merged MRs. Not resumable.
pub struct MergeRequestPages<'a, T: Transport, C: Clock> {
  client: &'a GitlabClient<T, C>,
  project: u64,
  filter: &'a MergeRequestFilter,
  state: FetchState,
  excluded: usize,
  outside_window: usize,
}

impl<'a, T: Transport, C: Clock> MergeRequestPages<'a, T, C> {
  /// Records dropped by the author exclusion list so far.
  pub fn excluded(&self) -> usize {
    self.excluded
  }

  /// Records whose merge instant fell outside the window so far.
  pub fn outside_window(&self) -> usize {
    self.outside_window
  }

  fn keep(&mut self, record: &MergeRecord) -> bool {
    if let Some(merged_at) = record.merged_at {
      if !self.filter.window.contains(merged_at) {
        self.outside_window += 1;
        return false;
      }
    }

    if self.filter.exclude.excludes(&record.author) {
      self.excluded += 1;
      return false;
    }

    true
  }
}

impl<'a, T: Transport, C: Clock> Iterator for MergeRequestPages<'a, T, C> {
  type Item = Result<MergeRecord, ReportError>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      match std::mem::replace(&mut self.state, FetchState::Done) {
        FetchState::Idle => {
          self.state = FetchState::Requesting { page: 1 };
        }
        FetchState::Requesting { page } => match self.client.fetch_page(self.project, page, self.filter) {
          Ok(batch) => {
            let mut records = VecDeque::with_capacity(batch.records.len());
            for r in batch.records {
              if self.keep(&r) {
                records.push_back(r);
              }
            }
            self.state = FetchState::Yielding {
              records,
              next_page: batch.next_page,
            };
          }
          Err(e) => {
            self.state = FetchState::Failed;
            return Some(Err(e));
          }
        },
        FetchState::Yielding { mut records, next_page } => match records.pop_front() {
          Some(r) => {
            self.state = FetchState::Yielding { records, next_page };
            return Some(Ok(r));
          }
          None => {
            self.state = match next_page {
              Some(page) => FetchState::Requesting { page },
              None => FetchState::Done,
            };
          }
        },
        FetchState::Done => return None,
        FetchState::Failed => {
          self.state = FetchState::Failed;
          return None;
        }
      }
    }
  }
}
