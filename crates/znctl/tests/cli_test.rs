//! Integration tests for the `znctl` binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without a tenant; the few commands that need one talk to a wiremock
//! server through `--base-url`.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `znctl` binary with env isolation.
///
/// Clears all `ZN_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn znctl_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("znctl");
    cmd.env("HOME", "/tmp/znctl-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/znctl-cli-test-nonexistent")
        .env_remove("ZN_PROFILE")
        .env_remove("ZN_API_KEY")
        .env_remove("ZN_BASE_URL")
        .env_remove("ZN_OUTPUT")
        .env_remove("ZN_TIMEOUT")
        .env_remove("ZN_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// An unsigned token whose payload is `claims`.
fn token_with(claims: &Value) -> String {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

/// Run a prepared command off the async test's runtime thread.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = znctl_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    znctl_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Zero Networks")
            .and(predicate::str::contains("assets"))
            .and(predicate::str::contains("clusters"))
            .and(predicate::str::contains("hunt"))
            .and(predicate::str::contains("break-glass")),
    );
}

#[test]
fn test_version_flag() {
    znctl_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("znctl"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    znctl_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    znctl_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = znctl_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_assets_list_without_credentials_is_auth_error() {
    znctl_cmd()
        .args(["assets", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No credentials"));
}

#[test]
fn test_malformed_token_is_auth_error() {
    znctl_cmd()
        .args(["token", "decode", "--token", "not-a-token"])
        .assert()
        .code(3);
}

#[test]
fn test_invalid_output_format() {
    let output = znctl_cmd()
        .args(["--output", "xml", "config", "path"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_pin_single_asset_requires_cluster() {
    znctl_cmd()
        .args(["--api-key", "a.b.c", "--base-url", "http://127.0.0.1:9"])
        .args(["clusters", "pin", "a:a:1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--cluster"));
}

#[test]
fn test_break_glass_requires_targets() {
    znctl_cmd()
        .args(["break-glass", "--command", "true"])
        .assert()
        .code(2);
}

// ── Offline commands ────────────────────────────────────────────────

#[test]
fn test_config_path() {
    znctl_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_token_decode_shows_routing_not_token() {
    let token = token_with(&json!({"aud": "tenant.example.com", "sub": "ops"}));
    let output = znctl_cmd()
        .args(["-o", "json", "token", "decode", "--token", &token])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let info: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["audience"], "tenant.example.com");
    assert!(info["routes_to"].as_str().unwrap().contains("tenant.example.com"));
    assert!(!String::from_utf8_lossy(&output.stdout).contains(&token));
}

#[test]
fn test_clusters_template_needs_no_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("pin.csv");
    znctl_cmd()
        .args(["clusters", "template"])
        .arg(&file)
        .assert()
        .success();
    let content = std::fs::read_to_string(&file).unwrap();
    assert_eq!(content.lines().next(), Some("AssetId,ClusterId"));
}

// ── Against a mock tenant ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_assets_list_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets"))
        .and(header("authorization", "a.b.c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "a:a:00001", "name": "web-01"},
                {"id": "a:a:00002", "name": "db-01"}
            ],
            "count": 2
        })))
        .mount(&server)
        .await;

    let mut cmd = znctl_cmd();
    cmd.args(["--api-key", "a.b.c", "--base-url", &server.uri()])
        .args(["-o", "json", "assets", "list"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let assets: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = assets
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["a:a:00001", "a:a:00002"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_group_add_members_partial_failure_exits_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/groups/custom/g:c:ops/members"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let mut cmd = znctl_cmd();
    cmd.args(["--api-key", "a.b.c", "--base-url", &server.uri()])
        .args(["groups", "add-members", "g:c:ops", "a:a:1", "a:a:2"])
        .args(["--continue-on-error"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(1), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("add-members operations failed"));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_break_glass_runs_resolvable_targets_and_logs_unknown_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets/a:a:1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": {"id": "a:a:1", "name": "srv-01"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets/a:a:404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Asset not found"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = znctl_cmd();
    cmd.args(["--api-key", "a.b.c", "--base-url", &server.uri(), "--yes"])
        .args(["break-glass", "--command", "echo {name}"])
        .args(["--asset", "a:a:404", "--asset", "a:a:1", "--log-dir"])
        .arg(dir.path());
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(1), "{}", combined_output(&output));

    let ok = std::fs::read_to_string(dir.path().join("breakglass_success.log")).unwrap();
    assert_eq!(ok, "srv-01: srv-01\n");
    let failed = std::fs::read_to_string(dir.path().join("breakglass_failure.log")).unwrap();
    assert!(failed.starts_with("a:a:404: lookup failed"), "{failed}");
}
