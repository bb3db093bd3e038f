use predicates::prelude::*;
use test_support::{cmd_bin, tempdir};

// All of these fail before any network call, so the URL is never contacted.
const UNREACHABLE: &str = "http://127.0.0.1:9";

#[test]
fn missing_token_fails() {
  cmd_bin("review-duration")
    .args(["--url", UNREACHABLE, "--projects", "1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing token"));
}

#[test]
fn no_projects_fails() {
  cmd_bin("review-duration")
    .env("GITLAB_TOKEN", "t")
    .args(["--url", UNREACHABLE])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no projects"));
}

#[test]
fn inverted_window_fails() {
  cmd_bin("review-duration")
    .args([
      "--url",
      UNREACHABLE,
      "--token",
      "t",
      "--projects",
      "1",
      "--since",
      "2025-03-10",
      "--until",
      "2025-03-01",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("until date is before since date"));
}

#[test]
fn large_window_needs_confirmation() {
  cmd_bin("review-duration")
    .args([
      "--url",
      UNREACHABLE,
      "--token",
      "t",
      "--projects",
      "1",
      "--since",
      "2025-01-01",
      "--until",
      "2025-03-01",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("pass --yes to continue"));
}

#[test]
fn unparseable_date_fails() {
  cmd_bin("review-duration")
    .args([
      "--url",
      UNREACHABLE,
      "--token",
      "t",
      "--projects",
      "1",
      "--since",
      "the twelfth of never",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--since"));
}

#[test]
fn unreadable_list_file_fails() {
  let td = tempdir();
  let missing = td.path().join("nope.txt");
  cmd_bin("review-duration")
    .args(["--url", UNREACHABLE, "--token", "t", "--project-paths-file"])
    .arg(&missing)
    .assert()
    .failure()
    .stderr(predicate::str::contains("nope.txt"));
}

#[test]
fn unknown_zone_is_a_usage_error() {
  cmd_bin("review-duration")
    .args(["--token", "t", "--projects", "1", "--tz", "Mars/Olympus"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown time zone"));
}

#[test]
fn unparseable_now_override_fails() {
  cmd_bin("review-duration")
    .args(["--url", UNREACHABLE, "--token", "t", "--projects", "1"])
    .args(["--now-override", "around lunchtime"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unrecognized --now-override"));
}
