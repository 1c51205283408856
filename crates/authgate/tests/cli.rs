// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives the compiled `authgate` binary against a mock API.

mod support;

use std::path::Path;
use std::process::Output;

use support::{spawn_api, PASSWORD, USERNAME};
use tokio::process::Command;

async fn authgate(base: &str, credentials: &Path, args: &[&str]) -> anyhow::Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_authgate"))
        .args(["--api-url", base, "--credentials"])
        .arg(credentials)
        .args(["--timeout-secs", "5"])
        .args(args)
        .env_remove("AUTHGATE_PASSWORD")
        .env_remove("AUTHGATE_LOG_FORMAT")
        .output()
        .await?;
    Ok(output)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_token(path: &Path, token: &str) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::json!({ "auth_token": token }).to_string())?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn login_status_logout_round_trip() -> anyhow::Result<()> {
    let (base, _api) = spawn_api("T1").await?;
    let dir = tempfile::tempdir()?;
    let creds = dir.path().join("state").join("credentials.json");

    let out = authgate(&base, &creds, &["status"]).await?;
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("not logged in"));

    let out = authgate(&base, &creds, &["login", "--username", USERNAME, "--password", PASSWORD]).await?;
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("logged in as alice"));
    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&creds)?)?;
    assert_eq!(saved["auth_token"], "T1");

    let out = authgate(&base, &creds, &["status"]).await?;
    assert_eq!(out.status.code(), Some(0));

    let out = authgate(&base, &creds, &["logout"]).await?;
    assert_eq!(out.status.code(), Some(0));
    let out = authgate(&base, &creds, &["status"]).await?;
    assert_eq!(out.status.code(), Some(1));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn login_is_skipped_when_already_authenticated() -> anyhow::Result<()> {
    let (base, _api) = spawn_api("T1").await?;
    let dir = tempfile::tempdir()?;
    let creds = dir.path().join("credentials.json");
    write_token(&creds, "OLD")?;

    let out = authgate(&base, &creds, &["login", "-u", USERNAME, "--password", PASSWORD]).await?;
    assert_eq!(out.status.code(), Some(0));
    assert!(stderr(&out).contains("already logged in"));
    assert!(std::fs::read_to_string(&creds)?.contains("OLD"));

    let out =
        authgate(&base, &creds, &["login", "-u", USERNAME, "--password", PASSWORD, "--force"]).await?;
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(std::fs::read_to_string(&creds)?.contains("T1"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_password_prints_server_message() -> anyhow::Result<()> {
    let (base, _api) = spawn_api("T1").await?;
    let dir = tempfile::tempdir()?;
    let creds = dir.path().join("credentials.json");

    let out = authgate(&base, &creds, &["login", "-u", USERNAME, "--password", "nope"]).await?;

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Invalid credentials"));
    assert!(!creds.exists());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn request_requires_session() -> anyhow::Result<()> {
    let (base, api) = spawn_api("T1").await?;
    let dir = tempfile::tempdir()?;
    let creds = dir.path().join("credentials.json");

    let out = authgate(&base, &creds, &["request", "GET", "/orders/1"]).await?;

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("not logged in"));
    assert_eq!(api.resource_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn request_prints_body_with_stored_token() -> anyhow::Result<()> {
    let (base, _api) = spawn_api("T1").await?;
    let dir = tempfile::tempdir()?;
    let creds = dir.path().join("credentials.json");
    write_token(&creds, "T1")?;

    let out = authgate(&base, &creds, &["request", "get", "/orders/7"]).await?;

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let body: serde_json::Value = serde_json::from_str(stdout(&out).trim())?;
    assert_eq!(body["id"], "7");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_refresh_clears_credentials() -> anyhow::Result<()> {
    // No login in this process, so there is no refresh cookie to present.
    let (base, api) = spawn_api("T2").await?;
    let dir = tempfile::tempdir()?;
    let creds = dir.path().join("credentials.json");
    write_token(&creds, "T1")?;

    let out = authgate(&base, &creds, &["request", "GET", "/orders/1"]).await?;

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("session expired"));
    assert_eq!(api.refresh_calls(), 1);
    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&creds)?)?;
    assert!(saved.get("auth_token").is_none());
    Ok(())
}

#[yare::parameterized(
    bad_scheme   = { &["--api-url", "ftp://example.com", "status"] },
    zero_timeout = { &["--timeout-secs", "0", "status"] },
    bad_format   = { &["--log-format", "yaml", "status"] },
)]
fn invalid_config_exits_with_usage_code(args: &[&str]) {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = std::process::Command::new(env!("CARGO_BIN_EXE_authgate"))
        .arg("--credentials")
        .arg(dir.path().join("credentials.json"))
        .args(args)
        .output()
        .expect("run authgate");
    assert_eq!(out.status.code(), Some(2));
}
