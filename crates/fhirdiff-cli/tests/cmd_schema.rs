//! Integration tests for `fhirdiff schema`.
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

fn fhirdiff(args: &[&str]) -> Output {
    Command::new(fhirdiff_bin())
        .args(args)
        .output()
        .expect("run fhirdiff")
}

#[test]
fn observation_fields_as_json() {
    let out = fhirdiff(&["schema", "Observation", "-f", "json"]);
    assert_eq!(out.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    let fields = value.as_array().expect("fields");
    let status = fields
        .iter()
        .find(|f| f["key"] == "status")
        .expect("status field");
    assert_eq!(status["required"], true);
    assert_eq!(status["kind"], "leaf");
    assert_eq!(fields[0]["key"], "id");
}

#[test]
fn array_fields_show_item_type() {
    let out = fhirdiff(&["schema", "Patient"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("HumanName[]"), "stdout: {stdout}");
}

#[test]
fn unknown_type_exits_2() {
    let out = fhirdiff(&["schema", "Spaceship"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Spaceship"));
}
