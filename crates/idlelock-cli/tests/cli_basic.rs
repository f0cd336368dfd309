//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary and verify outputs.

use std::io::Write;
use std::process::{Command, Stdio};

/// Run a CLI command with `stdin` piped in and return (stdout, stderr, code).
fn run_cli(args: &[&str], stdin: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_idlelock-cli"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    let output = child.wait_with_output().expect("Failed to wait for CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_clamp_bounds() {
    let (stdout, _, code) = run_cli(&["clamp", "10"], "");
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "30");

    let (stdout, _, _) = run_cli(&["clamp", "5000"], "");
    assert_eq!(stdout.trim(), "1800");

    let (stdout, _, _) = run_cli(&["clamp", "-5"], "");
    assert_eq!(stdout.trim(), "30");

    let (stdout, _, _) = run_cli(&["clamp", "120"], "");
    assert_eq!(stdout.trim(), "120");
}

#[test]
fn test_config_show_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "default_timeout_secs = 90\n").unwrap();

    let (stdout, _, code) = run_cli(&["config", "show", "--config", path.to_str().unwrap()], "");
    assert_eq!(code, 0);
    assert!(stdout.contains("default_timeout_secs = 90"));
    assert!(stdout.contains("event_buffer = 64"));
}

#[test]
fn test_config_show_missing_file_fails() {
    let (_, stderr, code) = run_cli(&["config", "show", "--config", "/nonexistent/idlelock.toml"], "");
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_watch_session() {
    let script = "start 60\nstatus\nbackground\nforeground\nproximity\nstop\nstop\nquit\n";
    let (stdout, stderr, code) = run_cli(&["watch"], script);
    assert_eq!(code, 0, "watch failed: {stderr}");

    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is JSON"))
        .collect();
    let types: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
    assert_eq!(
        types,
        vec![
            "tracking_started",
            "polling_paused",
            "deadline_reset",
            "deadline_reset",
            "tracking_stopped"
        ]
    );

    let status = events
        .iter()
        .find(|e| e.get("state").is_some())
        .expect("status line");
    assert_eq!(status["state"], "tracking");
    assert_eq!(status["timeout_secs"], 60);
    assert!(stderr.contains("not tracking"));
}
