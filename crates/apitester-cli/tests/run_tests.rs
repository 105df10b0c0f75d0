//! Tests for `apitester run` and `apitester config`.

use std::process::{Command, Output};

use tempfile::TempDir;

fn apitester(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_apitester"))
        .args(args)
        .current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

#[test]
fn test_unreachable_case_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("suite.yaml"),
        "name: refused\ntests:\n  - name: closed\n    url: http://127.0.0.1:1\n    assertions:\n      - $.a==1\n",
    )
    .unwrap();

    let output = apitester(&dir, &["run", "suite.yaml", "--timeout", "5"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ERROR closed"));
    assert!(stdout.contains("0 of 1 cases passed"));
}

#[test]
fn test_suite_without_runnable_cases_passes() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("draft.json"),
        r#"{"name": "draft", "tests": [{"name": "no-url", "assertions": ["$.a==1"]}]}"#,
    )
    .unwrap();

    let output = apitester(&dir, &["run", "draft.json", "--json"]);

    assert!(output.status.success());
    let run: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(run["suiteId"], "draft");
    assert_eq!(run["results"], serde_json::json!([]));
}

#[test]
fn test_invalid_suite_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("dup.yaml"),
        "name: dup\ntests:\n  - name: t1\n  - name: t1\n",
    )
    .unwrap();

    let output = apitester(&dir, &["run", "dup.yaml"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_config_prints_defaults() {
    let dir = TempDir::new().unwrap();

    let output = apitester(&dir, &["config"]);

    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("[server]"));
    assert!(text.contains("port = 8080"));
    assert!(text.contains("x-upstream-id"));
}
