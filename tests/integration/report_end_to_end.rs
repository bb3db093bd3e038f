use predicates::prelude::*;
use test_support::{cmd_bin, tempdir, FakeGitlab, FakeRequest, Reply};

fn mr(iid: u64, username: &str, created_at: &str, merged_at: &str) -> String {
  format!(
    r#"{{"iid":{iid},"title":"MR {iid}","author":{{"username":"{username}","name":"{username} name"}},"created_at":"{created_at}","merged_at":"{merged_at}","target_branch":"main","source_branch":"feature/{iid}","web_url":"https://gitlab.example.com/group/app/-/merge_requests/{iid}"}}"#
  )
}

fn route(req: &FakeRequest) -> Reply {
  let page = req.query.get("page").map(String::as_str).unwrap_or("1");
  match req.path.as_str() {
    "/api/v4/projects/group/app" => Reply::json(200, r#"{"id":42,"path_with_namespace":"group/app"}"#),
    "/api/v4/projects/7" => Reply::json(200, r#"{"id":7,"path_with_namespace":"team/svc"}"#),
    "/api/v4/projects/42/merge_requests" if page == "1" => {
      let body = format!(
        "[{},{}]",
        // Mon 10:00 -> Tue 10:00
        mr(11, "alice", "2025-03-03T10:00:00Z", "2025-03-04T10:00:00Z"),
        mr(12, "renovate-bot", "2025-03-04T09:00:00Z", "2025-03-04T09:30:00Z")
      );
      Reply::json(200, &body)
        .header("X-Next-Page", "2")
        .header("RateLimit-Remaining", "500")
    }
    "/api/v4/projects/42/merge_requests" => {
      // Fri 16:00 -> Mon 10:00 across a weekend
      let body = format!("[{}]", mr(13, "bob", "2025-03-07T16:00:00Z", "2025-03-10T10:00:00Z"));
      Reply::json(200, &body).header("X-Next-Page", "")
    }
    "/api/v4/projects/7/merge_requests" => Reply::json(403, r#"{"message":"403 Forbidden"}"#),
    _ => Reply::json(404, r#"{"message":"404 Project Not Found"}"#),
  }
}

#[test]
fn writes_detail_and_summary_and_lists_failures() {
  let server = FakeGitlab::start(route);
  let td = tempdir();
  let detail = td.path().join("detail.csv");

  cmd_bin("review-duration")
    .current_dir(td.path())
    .env("GITLAB_TOKEN", "secret")
    .args(["--url", &server.base_url()])
    .args(["--project-paths", "group/app", "https://gitlab.example.com/group/missing"])
    .args(["--projects", "7"])
    .args(["--since", "2025-03-01", "--until", "2025-03-14"])
    .args(["--per-page", "2", "--exclude-author", "renovate-bot"])
    .args(["--now-override", "2025-03-15T00:00:00Z"])
    .arg("--out")
    .arg(&detail)
    .assert()
    .success()
    .stdout(predicate::str::contains("[done] Wrote 2 rows to"))
    .stdout(predicate::str::contains("[stats overall] Count: 2 | Avg: 45.0h (1.88d)"))
    .stdout(predicate::str::contains("[failures] 2 project(s), 0 record(s)"))
    .stdout(predicate::str::contains("project https://gitlab.example.com/group/missing: project not found"))
    .stdout(predicate::str::contains("project team/svc: retrieval failed for project 7 at page 1"));

  let text = std::fs::read_to_string(&detail).unwrap();
  insta::assert_snapshot!(text.trim_end(), @r"
project_id,project_path_with_namespace,iid,title,author,created_at,merged_at,time_open_hours,time_open_days,business_time_open_hours,business_time_open_days,target_branch,source_branch,web_url
42,group/app,11,MR 11,alice,2025-03-03T10:00:00Z,2025-03-04T10:00:00Z,24.0,1.0,8.0,0.33,main,feature/11,https://gitlab.example.com/group/app/-/merge_requests/11
42,group/app,13,MR 13,bob,2025-03-07T16:00:00Z,2025-03-10T10:00:00Z,66.0,2.75,2.0,0.08,main,feature/13,https://gitlab.example.com/group/app/-/merge_requests/13
");

  let summary = std::fs::read_to_string(td.path().join("review_duration_summary_2025-03-01_2025-03-14.csv")).unwrap();
  let lines: Vec<&str> = summary.lines().collect();
  assert_eq!(
    lines[0],
    "project_id,project_path_with_namespace,metric,count,avg_hours,p50_hours,p90_hours,min_hours,max_hours"
  );
  assert_eq!(lines[1], "42,group/app,raw,2,45.0,45.0,61.8,24.0,66.0");
  assert_eq!(lines[2], "42,group/app,business,2,5.0,5.0,7.4,2.0,8.0");
  assert_eq!(lines.len(), 3);

  let seen = server.requests();
  let mr_pages: Vec<&FakeRequest> = seen
    .iter()
    .filter(|r| r.path == "/api/v4/projects/42/merge_requests")
    .collect();
  assert_eq!(mr_pages.len(), 2);
  let first = mr_pages[0];
  assert_eq!(first.method, "GET");
  assert_eq!(first.query.get("state").map(String::as_str), Some("merged"));
  assert_eq!(first.query.get("per_page").map(String::as_str), Some("2"));
  assert_eq!(
    first.query.get("updated_after").map(String::as_str),
    Some("2025-03-01T00:00:00Z")
  );
  assert_eq!(mr_pages[1].query.get("page").map(String::as_str), Some("2"));
  assert!(seen.iter().all(|r| r.header("private-token") == Some("secret")));

  // 403 is not retried
  assert_eq!(
    seen.iter().filter(|r| r.path == "/api/v4/projects/7/merge_requests").count(),
    1
  );
}

#[test]
fn nothing_resolvable_is_an_error() {
  let server = FakeGitlab::start(|_req| Reply::json(404, r#"{"message":"404 Project Not Found"}"#));
  let td = tempdir();

  cmd_bin("review-duration")
    .current_dir(td.path())
    .args(["--url", &server.base_url(), "--token", "t"])
    .args(["--project-paths", "group/none"])
    .args(["--now-override", "2025-03-15T00:00:00Z"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no projects could be resolved"));
}

#[test]
fn empty_project_still_writes_headers() {
  let server = FakeGitlab::start(|req| match req.path.as_str() {
    "/api/v4/projects/5" => Reply::json(200, r#"{"id":5,"path_with_namespace":"g/empty"}"#),
    _ => Reply::json(200, "[]"),
  });
  let td = tempdir();

  cmd_bin("review-duration")
    .current_dir(td.path())
    .env("DAYS_BACK", "7")
    .args(["--url", &server.base_url(), "--token", "t", "--projects", "5"])
    .args(["--now-override", "2025-03-15T00:00:00Z"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No merged MRs found in the window."));

  let detail = std::fs::read_to_string(td.path().join("gitlab_merged_mrs.csv")).unwrap();
  assert_eq!(detail.lines().count(), 1);

  // DAYS_BACK=7 from a fixed now
  let summary = td.path().join("review_duration_summary_2025-03-08_2025-03-15.csv");
  assert!(summary.exists());
}
