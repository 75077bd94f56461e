//! CLI integration tests using assert_cmd.
//!
//! Only the offline surface is covered here: help output, argument
//! parsing, and config loading errors. Anything that needs a live server
//! is exercised against the mock API in the client crate's tests.

use assert_cmd::Command;
use predicates::prelude::*;

fn examsit() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("examsit").unwrap()
}

#[test]
fn help_lists_subcommands() {
    examsit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sections"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("take"));
}

#[test]
fn version_flag() {
    examsit()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("examsit"));
}

#[test]
fn sections_with_missing_config_fails() {
    examsit()
        .arg("sections")
        .arg("--config")
        .arg("/nonexistent/examsit.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn status_requires_attempt() {
    examsit()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--attempt"));
}

#[test]
fn take_with_malformed_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("examsit.toml");
    std::fs::write(&path, "base_url = [not toml").unwrap();

    examsit()
        .arg("take")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}
