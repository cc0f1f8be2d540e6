// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Integration tests for the `querify` binary. Each test runs a command on
//! a fixture under `tests/fixtures` and checks its output.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn querify(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_querify"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("QUERIFY_LOG")
        .output()
        .expect("failed to run querify")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn lists_actions() {
    let path = fixture("orders.cs");
    let out = querify(&["actions", path.to_str().unwrap()]);
    assert!(out.status.success());
    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "{}", text);
    assert!(lines[0].contains("7:34"));
    assert!(lines[0].contains("Where.Select"));
    assert!(lines[0].ends_with("from t in xs"));
    assert!(lines[1].contains("Cast"));
    assert!(lines[1].ends_with("from int _1 in xs"));
}

#[test]
fn lists_actions_as_json() {
    let path = fixture("orders.cs");
    let out = querify(&["actions", path.to_str().unwrap(), "--json"]);
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value[0]["operators"], serde_json::json!(["Where", "Select"]));
    assert_eq!(value[0]["parenthesize"], false);
    assert_eq!(value[1]["parenthesize"], true);
    assert_eq!(value[1]["line"], 8);
}

#[test]
fn converts_at_line_and_column() {
    let path = fixture("orders.cs");
    let out = querify(&["convert", path.to_str().unwrap(), "7:18"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = stdout(&out);
    assert!(text.contains("\t\tvar ys = \n\tfrom t in xs\n\twhere t > 0\n\tselect t * 2;\n"));
    assert!(text.contains("var n = xs.Cast<int> ().Count ();"));
}

#[test]
fn converts_with_space_indent() {
    let path = fixture("orders.cs");
    let out = querify(&["convert", path.to_str().unwrap(), "8:14", "--indent", "2"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("var n = (\n  from int _1 in xs\n  select _1).Count ();"));
}

#[test]
fn writes_in_place() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.cs");
    std::fs::copy(fixture("orders.cs"), &path).unwrap();
    let out = querify(&["convert", path.to_str().unwrap(), "7:34", "--write"]);
    assert!(out.status.success());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("from t in xs"));
    assert!(!written.contains("xs.Where"));
}

#[test]
fn inapplicable_position_fails() {
    let path = fixture("orders.cs");
    let out = querify(&["convert", path.to_str().unwrap(), "9:10"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no query operator chain"));
}

#[test]
fn syntax_errors_fail() {
    let path = fixture("broken.cs");
    for command in ["parse", "actions", "outline"] {
        let out = querify(&[command, path.to_str().unwrap()]);
        assert_eq!(out.status.code(), Some(1), "{}", command);
        assert!(String::from_utf8_lossy(&out.stderr).contains("broken.cs:5:"), "{}", command);
    }
}

#[test]
fn outline() {
    let path = fixture("orders.cs");
    let out = querify(&["outline", path.to_str().unwrap()]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("class Orders"));
    assert!(text.contains("method Orders.Positive (int[] xs): int[]"));
}

#[test]
fn missing_file_fails() {
    let out = querify(&["lex", "no/such/file.cs"]);
    assert_eq!(out.status.code(), Some(1));
}
