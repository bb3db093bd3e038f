// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: HTTP seam for the GitLab REST API (trait + blocking ureq binding)
// role: gitlab/transport
// inputs: absolute URL, query pairs; token sent as PRIVATE-TOKEN
// outputs: HttpResponse with status, lowercased headers and body text
// side_effects: Network calls to the configured GitLab instance
// invariants:
// - non-2xx statuses are returned as responses, not errors; callers classify them
// - only connection-level failures surface as TransportError
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  headers: HashMap<String, String>,
  pub body: String,
}

impl HttpResponse {
  pub fn new(status: u16, headers: &[(&str, &str)], body: &str) -> Self {
    let headers = headers
      .iter()
      .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
      .collect();
    Self {
      status,
      headers,
      body: body.to_string(),
    }
  }

  /// Case-insensitive header lookup.
  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn is_throttled(&self) -> bool {
    self.status == 429
  }

  pub fn is_server_error(&self) -> bool {
    self.status >= 500
  }
}

pub trait Transport {
  fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, TransportError>;
}

pub struct HttpTransport {
  agent: ureq::Agent,
  token: String,
}

impl HttpTransport {
  pub fn new(token: String, timeout: Duration) -> Self {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    Self { agent, token }
  }

  fn collect(resp: ureq::Response) -> Result<HttpResponse, TransportError> {
    let status = resp.status();
    let headers: HashMap<String, String> = resp
      .headers_names()
      .into_iter()
      .filter_map(|name| {
        let value = resp.header(&name)?.to_string();
        Some((name.to_ascii_lowercase(), value))
      })
      .collect();
    let body = resp
      .into_string()
      .map_err(|e| TransportError(format!("reading response body: {e}")))?;

    Ok(HttpResponse { status, headers, body })
  }
}

impl Transport for HttpTransport {
  fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, TransportError> {
    let mut req = self
      .agent
      .get(url)
      .set("Accept", "application/json")
      .set("User-Agent", "review-duration")
      .set("PRIVATE-TOKEN", &self.token);

    for (k, v) in query {
      req = req.query(k, v);
    }

    match req.call() {
      Ok(resp) => Self::collect(resp),
      Err(ureq::Error::Status(_, resp)) => Self::collect(resp),
      Err(ureq::Error::Transport(t)) => Err(TransportError(t.to_string())),
    }
  }
}
