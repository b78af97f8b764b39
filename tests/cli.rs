//! CLI test cases.
//!
//! None of these talk to Mistral. Runs that get as far as OCR are pointed at
//! a local port nothing listens on, so every request fails quickly with a
//! transport error.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// An API base URL that refuses connections.
static UNREACHABLE_API_BASE: &str = "http://127.0.0.1:1/v1";

/// Create a new `Command` with our binary, isolated from the caller's
/// environment.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("mistral-ocr").unwrap();
    cmd.env_remove("MISTRAL_API_KEY")
        .env("MISTRAL_API_BASE", UNREACHABLE_API_BASE)
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MISTRAL_API_KEY"));
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_file_and_directory_conflict() {
    cmd()
        .args(["--file", "a.pdf", "--directory", "docs"])
        .assert()
        .failure();
}

#[test]
fn test_missing_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--api-key", "sk-test", "--file", "nope.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_unsupported_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--api-key", "sk-test", "--file", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file type"));
}

#[test]
fn test_api_key_is_asked_for_once_and_saved() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scan.pdf"), b"%PDF-1.4\n").unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["--file", "scan.pdf", "--allowed-failure-rate", "1.0"])
        .write_stdin("sk-from-prompt\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Enter your Mistral API key"));

    let env = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(env, "MISTRAL_API_KEY=sk-from-prompt\n");

    // The second run finds the saved key and never asks.
    cmd()
        .current_dir(dir.path())
        .args(["--file", "scan.pdf", "--allowed-failure-rate", "1.0"])
        .write_stdin("")
        .assert()
        .success()
        .stderr(predicate::str::contains("Enter your Mistral API key").not());
}

#[test]
fn test_closed_stdin_without_credentials_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scan.pdf"), b"%PDF-1.4\n").unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--file", "scan.pdf"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no Mistral API key available"));
    assert!(!dir.path().join(".env").exists());
}

#[test]
fn test_directory_batch_reports_every_failure() {
    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.pdf"), b"%PDF-1.4\n").unwrap();
    fs::write(docs.join("b.png"), b"\x89PNG\r\n\x1a\n").unwrap();
    fs::write(docs.join("c.txt"), "skipped").unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["--api-key", "sk-test", "--directory", "docs", "--timeout", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Found 2 document(s)"))
        .stderr(predicate::str::contains("a.pdf"))
        .stderr(predicate::str::contains("b.png"))
        .stderr(predicate::str::contains("0 of 2 documents succeeded, 2 failed"));

    // Nothing was written for the failed documents.
    let mut names = fs::read_dir(&docs)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, ["a.pdf", "b.png", "c.txt"]);
}

#[test]
fn test_interactive_session_reads_answers_from_stdin() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("photo.jpg"), b"\xff\xd8\xff").unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["--api-key", "sk-test", "--allowed-failure-rate", "1.0"])
        .write_stdin("\"photo.jpg\"\n3\ny\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Output format"))
        .stderr(predicate::str::contains("Found 1 document(s) in photo.jpg"));
}
