// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn user-supplied project ids, paths or URLs into ProjectRef values
// role: gitlab/resolver
// inputs: raw strings from --projects / --project-paths / --project-paths-file
// outputs: ProjectRef { id, path } or ProjectNotFound
// side_effects: at most one lookup per distinct path input per run (successes cached)
// invariants:
// - all-digit input resolves locally with no lookup call
// - only successful resolutions are cached; failures are retried on the next call
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cell::RefCell;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::client::GitlabClient;
use super::rate_limit::Clock;
use super::transport::Transport;
use crate::error::ReportError;
use crate::model::{ApiProject, ProjectRef};

/// Minimal lookup seam so the resolver can be tested without HTTP.
pub trait ProjectLookup {
  fn lookup(&self, id_or_path: &str) -> Result<ApiProject, String>;
}

impl<T: Transport, C: Clock> ProjectLookup for GitlabClient<T, C> {
  fn lookup(&self, id_or_path: &str) -> Result<ApiProject, String> {
    self.project(id_or_path).map_err(|e| {
      if e.is_not_found() {
        "not found or not accessible with this token".to_string()
      } else {
        e.to_string()
      }
    })
  }
}

static SCHEME_HOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^/]+").expect("valid regex"));

/// Strip scheme and host, drop everything from a `/-/` segment on, trim slashes.
///
/// `https://gitlab.com/group/sub/app/-/merge_requests` -> `group/sub/app`
pub fn normalize_path(input: &str) -> String {
  let s = input.trim();
  let s = SCHEME_HOST.replace(s, "");
  let s = match s.find("/-/") {
    Some(i) => &s[..i],
    None => &s[..],
  };
  let s = s.split(['?', '#']).next().unwrap_or_default();
  s.trim_matches('/').trim_end_matches(".git").to_string()
}

fn is_numeric(input: &str) -> bool {
  !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}

/// Per-run memo of successful resolutions, keyed by raw input.
///
/// Owned by whoever drives a run and lent to each resolver.
#[derive(Debug, Default)]
pub struct ProjectCache {
  entries: RefCell<HashMap<String, ProjectRef>>,
}

impl ProjectCache {
  pub fn get(&self, input: &str) -> Option<ProjectRef> {
    self.entries.borrow().get(input).cloned()
  }

  pub fn insert(&self, input: &str, project: ProjectRef) {
    self.entries.borrow_mut().insert(input.to_string(), project);
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.borrow().len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.entries.borrow().is_empty()
  }
}

pub struct ProjectResolver<'a, L: ProjectLookup> {
  lookup: &'a L,
  cache: &'a ProjectCache,
}

impl<'a, L: ProjectLookup> ProjectResolver<'a, L> {
  pub fn new(lookup: &'a L, cache: &'a ProjectCache) -> Self {
    Self { lookup, cache }
  }

  pub fn resolve(&self, input: &str) -> Result<ProjectRef, ReportError> {
    let raw = input.trim();

    if let Some(hit) = self.cache.get(raw) {
      return Ok(hit);
    }

    if is_numeric(raw) {
      let id = raw.parse::<u64>().map_err(|e| ReportError::ProjectNotFound {
        input: input.to_string(),
        reason: e.to_string(),
      })?;
      let project = ProjectRef::from_id(id);
      self.cache.insert(raw, project.clone());
      return Ok(project);
    }

    let path = normalize_path(raw);
    if path.is_empty() {
      return Err(ReportError::ProjectNotFound {
        input: input.to_string(),
        reason: "empty project path".to_string(),
      });
    }

    let found = self.lookup.lookup(&path).map_err(|reason| ReportError::ProjectNotFound {
      input: input.to_string(),
      reason,
    })?;

    let project = ProjectRef {
      id: found.id,
      path: found.path_with_namespace.unwrap_or(path),
    };
    debug!(input = raw, id = project.id, path = project.path.as_str(), "resolved project");
    self.cache.insert(raw, project.clone());
    Ok(project)
  }

  /// Fill the display path of an id-only ref; keeps the id string when the lookup fails.
  pub fn describe(&self, project: ProjectRef) -> ProjectRef {
    if project.has_display_path() {
      return project;
    }

    match self.lookup.lookup(&project.id.to_string()) {
      Ok(found) => ProjectRef {
        id: project.id,
        path: found.path_with_namespace.unwrap_or(project.path),
      },
      Err(reason) => {
        warn!(id = project.id, reason = reason.as_str(), "could not fetch project metadata");
        project
      }
    }
  }
}
