//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Commands that
//! need a backend are pointed at a closed local port to exercise the
//! degraded paths.

use std::process::Command;

const UNREACHABLE: &str = "http://127.0.0.1:1";

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "survey-wizard-cli", "--"])
        .args(args)
        .env("SURVEY_WIZARD_LOG", "error")
        .env_remove("SURVEY_WIZARD_API_URL")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_help_lists_commands() {
    let (stdout, _, code) = run_cli(&["--help"]);
    assert_eq!(code, 0);
    for cmd in ["run", "questions", "distribution", "validate", "config", "completions"] {
        assert!(stdout.contains(cmd), "missing {cmd} in help");
    }
}

#[test]
fn test_config_path() {
    let (stdout, _, code) = run_cli(&["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
}

#[test]
fn test_config_get_known_key() {
    let (stdout, _, code) = run_cli(&["config", "get", "survey.max_questions"]);
    assert_eq!(code, 0);
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_config_get_unknown_key_fails() {
    let (_, stderr, code) = run_cli(&["config", "get", "survey.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_is_json() {
    let (stdout, _, code) = run_cli(&["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("config list is JSON");
    assert!(parsed["api"]["base_url"].is_string());
    assert!(parsed["llm"]["enabled"].is_boolean());
}

#[test]
fn test_completions_bash() {
    let (stdout, _, code) = run_cli(&["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("survey-wizard"));
}

#[test]
fn test_questions_unreachable_backend() {
    let (stdout, _, code) = run_cli(&["--api-url", UNREACHABLE, "questions"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No questions available"));
}

#[test]
fn test_distribution_unreachable_backend_has_no_data() {
    let (stdout, _, code) = run_cli(&["--api-url", UNREACHABLE, "distribution", "1", "--answer", "4"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No data available yet"));
}

#[test]
fn test_distribution_rejects_off_scale_answer() {
    let (stdout, stderr, code) = run_cli(&["--api-url", UNREACHABLE, "distribution", "1", "--answer", "9"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("outside the scale"));
    assert!(!stdout.contains("No data available yet"));
}

#[test]
fn test_distribution_json() {
    let (stdout, _, code) = run_cli(&["--api-url", UNREACHABLE, "distribution", "1", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("distribution is JSON");
    assert_eq!(parsed["kind"], "no_data_yet");
}

#[test]
fn test_validate_blank_code_fails() {
    let (_, stderr, code) = run_cli(&["validate", "  "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("User code is empty"));
}

#[test]
fn test_validate_unreachable_backend_fails() {
    let (_, stderr, code) = run_cli(&["--api-url", UNREACHABLE, "validate", "ABCD1234"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_invalid_api_url_is_rejected() {
    let (_, stderr, code) = run_cli(&["--api-url", "not a url", "questions"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("api.base_url"));
}
