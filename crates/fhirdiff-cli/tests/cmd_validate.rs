//! Integration tests for `fhirdiff validate`.
#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Path to the compiled `fhirdiff` binary.
fn fhirdiff_bin() -> PathBuf {
    let mut path = std::env::current_exe().expect("current exe");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("fhirdiff");
    path
}

/// Path to a shared fixture file.
fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../../tests/fixtures");
    path.push(name);
    path
}

fn fhirdiff(args: &[&str]) -> Output {
    Command::new(fhirdiff_bin())
        .args(args)
        .output()
        .expect("run fhirdiff")
}

#[test]
fn valid_bundle_exits_0() {
    let file = fixture("bundle_true.json");
    let out = fhirdiff(&["validate", file.to_str().expect("path")]);
    assert_eq!(
        out.status.code(),
        Some(0),
        "stdout: {}",
        String::from_utf8_lossy(&out.stdout)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 5);
    assert!(stdout.contains("Patient/pat-1: valid"));
}

#[test]
fn single_resource_is_checked() {
    let file = fixture("observation_true.json");
    let out = fhirdiff(&["validate", file.to_str().expect("path"), "-f", "json"]);
    assert_eq!(out.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(value[0]["resource"], "Observation/obs-1");
    assert_eq!(value[0]["valid"], true);
}

#[test]
fn invalid_resource_exits_1_with_issues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("obs.json");
    std::fs::write(
        &file,
        r#"{"resourceType": "Observation", "id": "o", "code": {"text": "x"}, "colour": "red"}"#,
    )
    .expect("write");
    let out = fhirdiff(&["validate", file.to_str().expect("path"), "-f", "json"]);
    assert_eq!(out.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(value[0]["valid"], false);
    let issues = value[0]["issues"].as_array().expect("issues");
    assert!(issues.len() >= 2, "issues: {issues:?}");
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid"));
}

#[test]
fn invalid_json_exits_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("bad.json");
    std::fs::write(&file, "[").expect("write");
    let out = fhirdiff(&["validate", file.to_str().expect("path")]);
    assert_eq!(out.status.code(), Some(2));
}
