//! Tests for the hyperdoc command-line tool.

#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(FIXTURES_DIR).join(name)
}

fn hyperdoc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hyperdoc"))
        .args(args)
        .output()
        .expect("run hyperdoc")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_dump_text() {
    let path = fixture("people.html");
    let output = hyperdoc(&["dump", path.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));

    let out = stdout(&output);
    assert!(out.starts_with("document \"People involved"), "{out}");
    assert!(out.contains("anchor z3"), "{out}");
}

#[test]
fn test_dump_json_reports_diagnostics() {
    let path = fixture("project.html");
    let output = hyperdoc(&["dump", "--json", path.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("W_UNTERMINATED_STYLE"));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["title"], "The World Wide Web project");
    assert_eq!(json["anchors"].as_array().unwrap().len(), 3);
    assert_eq!(json["diagnostics"][0]["code"], "W_UNTERMINATED_STYLE");
    assert!(json["address"].as_str().unwrap().starts_with("file://"));
    assert!(!json["runs"].as_array().unwrap().is_empty());
}

#[test]
fn test_quiet_suppresses_diagnostics() {
    let path = fixture("project.html");
    let output = hyperdoc(&["-q", "dump", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stderr(&output).is_empty(), "{}", stderr(&output));
}

#[test]
fn test_normalize_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.html");
    let path = fixture("project.html");
    let output = hyperdoc(&[
        "-q",
        "normalize",
        path.to_str().unwrap(),
        "-o",
        out_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(written.starts_with("<TITLE>The World Wide Web project</TITLE>\n"));
    assert!(written.contains("HREF=\"people.html#z3\""), "{written}");

    // The normalized form reads back without complaint.
    let again = hyperdoc(&["normalize", out_path.to_str().unwrap()]);
    assert!(again.status.success());
    assert!(stderr(&again).is_empty(), "{}", stderr(&again));
    // Explicitly named anchors take fresh serials on each read, so only the
    // NEXTID counter may move.
    let body = |s: &str| -> Vec<String> {
        s.lines()
            .filter(|line| !line.starts_with("<NEXTID"))
            .map(str::to_string)
            .collect()
    };
    assert_eq!(body(&stdout(&again)), body(&written));
}

#[test]
fn test_strict_normalize_fails_on_problems() {
    let path = fixture("project.html");
    let output = hyperdoc(&["normalize", "--strict", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("strict mode"));
}

#[test]
fn test_styles_round_trip_through_file() {
    let output = hyperdoc(&["styles"]);
    assert!(output.status.success());
    let standard = stdout(&output);
    assert!(standard.starts_with("sheet = standard\n"));
    assert!(standard.contains("[Heading1]\ntag = H1\n"));

    let dir = tempfile::tempdir().unwrap();
    let sheet_path = dir.path().join("my.styles");
    std::fs::write(&sheet_path, &standard).unwrap();
    let output = hyperdoc(&["styles", "--styles", sheet_path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), standard);
}

#[test]
fn test_missing_input_fails() {
    let output = hyperdoc(&["dump", "/nonexistent/page.html"]);
    assert!(!output.status.success());
    assert!(stderr(&output).starts_with("error: "));
}
