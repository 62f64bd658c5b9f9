//! Integration tests for the `capdeck` CLI binary.
//!
//! Argument parsing, help output and completions run without an agent;
//! the end-to-end tests point the binary at a wiremock agent.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// `user:pass`
const BASIC_AUTH: &str = "Basic dXNlcjpwYXNz";

/// Build a [`Command`] for the `capdeck` binary with env isolation.
///
/// Clears all `CAPDECK_*` env vars and points the config directory at
/// `dir` so tests never touch the user's real configuration.
fn capdeck_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("capdeck");
    cmd.env("CAPDECK_CONFIG_DIR", dir)
        .env("NO_COLOR", "1")
        .env_remove("CAPDECK_HOST")
        .env_remove("CAPDECK_PORT")
        .env_remove("CAPDECK_SCHEMA")
        .env_remove("CAPDECK_PATH")
        .env_remove("CAPDECK_OUTPUT")
        .env_remove("CAPDECK_PASSWORD")
        .env_remove("CAPDECK_TIMEOUT")
        .env_remove("CAPDECK_DEV")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn session_body(version: &str) -> serde_json::Value {
    json!({
        "version": version,
        "modules": [
            { "name": "events.stream", "running": true, "description": "Print events" },
            { "name": "net.recon", "running": false }
        ],
        "env": { "data": { "iface.name": "eth0" } },
        "caplets": [ { "name": "http-ui", "path": "/caplets/http-ui.cap", "size": 10,
                       "code": ["set http.server.path /ui"] } ]
    })
}

async fn agent(version: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body(version)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    server
}

/// `login user` against `server` with the password from the environment.
fn login(dir: &Path, server: &MockServer, password: &str) -> std::process::Output {
    capdeck_cmd(dir)
        .env("CAPDECK_PASSWORD", password)
        .args(["--host", "127.0.0.1", "--port"])
        .arg(server.address().port().to_string())
        .args(["login", "user"])
        .output()
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = capdeck_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("remote agent")
            .and(predicate::str::contains("session"))
            .and(predicate::str::contains("events"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("capdeck"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Errors ──────────────────────────────────────────────────────────

#[test]
fn test_invalid_output_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path())
        .args(["-o", "xml", "status"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_status_without_login_exits_with_auth_code() {
    let dir = TempDir::new().unwrap();
    let output = capdeck_cmd(dir.path()).arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("Not logged in"), "{text}");
}

#[test]
fn test_unreachable_agent_exits_with_connection_code() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("auth.toml"),
        "username = \"user\"\npassword = \"pass\"\n",
    )
    .unwrap();
    // Port 9 (discard) is closed on test machines
    let output = capdeck_cmd(dir.path())
        .args(["--port", "9", "--timeout", "2", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

// ── Settings ────────────────────────────────────────────────────────

#[test]
fn test_settings_show_defaults() {
    let dir = TempDir::new().unwrap();
    let output = capdeck_cmd(dir.path())
        .args(["settings", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["url"], "http://127.0.0.1:8081/api");
    assert_eq!(value["interval"], 1000);
    assert_eq!(value["events"], 25);
}

#[test]
fn test_settings_set_persists() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path())
        .args(["settings", "set", "port", "9090"])
        .assert()
        .success();
    assert!(dir.path().join("settings.toml").exists());

    capdeck_cmd(dir.path())
        .args(["settings", "show", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://127.0.0.1:9090/api"));
}

#[test]
fn test_settings_set_rejects_bad_number() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path())
        .args(["settings", "set", "interval", "fast"])
        .assert()
        .code(2);
    assert!(!dir.path().join("settings.toml").exists());
}

#[test]
fn test_flag_overrides_are_not_saved_by_show() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path())
        .args(["--host", "10.1.1.1", "settings", "show", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://10.1.1.1:8081/api"));
    assert!(!dir.path().join("settings.toml").exists());
}

#[test]
fn test_settings_path_prints_config_dir() {
    let dir = TempDir::new().unwrap();
    capdeck_cmd(dir.path())
        .args(["settings", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(dir.path().display().to_string()));
}

// ── Against a mock agent ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_status_and_logout() {
    let server = agent("2.32.0").await;
    let dir = TempDir::new().unwrap();

    let output = login(dir.path(), &server, "pass");
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(dir.path().join("auth.toml").exists());
    assert!(dir.path().join("settings.toml").exists());

    // Saved settings carry the port, so no flags are needed from here on
    let output = capdeck_cmd(dir.path())
        .args(["status", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["version"], "2.32.0");
    assert_eq!(status["auth"], "logged-in");
    assert_eq!(status["modules"], 2);
    assert_eq!(status["ready"], true);

    capdeck_cmd(dir.path()).arg("logout").assert().success();
    assert!(!dir.path().join("auth.toml").exists());
    assert!(!dir.path().join("settings.toml").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_with_wrong_password_exits_with_auth_code() {
    let server = agent("2.32.0").await;
    let dir = TempDir::new().unwrap();

    let output = login(dir.path(), &server, "wrong");
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(!dir.path().join("auth.toml").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_old_agent_is_rejected_unless_dev() {
    let server = agent("2.0.0").await;
    let dir = TempDir::new().unwrap();

    let output = login(dir.path(), &server, "pass");
    assert_eq!(output.status.code(), Some(9), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("2.0.0"));
    assert!(!dir.path().join("auth.toml").exists());

    let output = capdeck_cmd(dir.path())
        .env("CAPDECK_PASSWORD", "pass")
        .args(["--dev", "--host", "127.0.0.1", "--port"])
        .arg(server.address().port().to_string())
        .args(["login", "user"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_views() {
    let server = agent("2.32.0").await;
    let dir = TempDir::new().unwrap();
    assert!(login(dir.path(), &server, "pass").status.success());

    capdeck_cmd(dir.path())
        .args(["session", "modules", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::eq("events.stream\nnet.recon\n"));

    capdeck_cmd(dir.path())
        .args(["session", "env", "iface.name", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::eq("eth0\n"));

    capdeck_cmd(dir.path())
        .args(["session", "caplets", "http-ui"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set http.server.path /ui"));

    capdeck_cmd(dir.path())
        .args(["session", "modules", "nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_and_events() {
    let server = agent("2.32.0").await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(body_json(json!({ "cmd": "net.recon on" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "msg": "ok" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "unknown command" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("n", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "tag": "wifi.ap.new", "time": "2024-05-01T10:00:00Z", "data": { "mac": "aa" } },
            { "tag": "sys.log", "time": "2024-05-01T10:00:01Z", "data": "started" }
        ])))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    assert!(login(dir.path(), &server, "pass").status.success());

    capdeck_cmd(dir.path())
        .args(["run", "net.recon", "on"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));

    capdeck_cmd(dir.path())
        .args(["run", "bogus"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown command"));

    capdeck_cmd(dir.path())
        .args(["events", "list", "-t", "wifi.", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wifi.ap.new").and(predicate::str::contains("sys.log").not()));
}
