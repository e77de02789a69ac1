//! CLI integration tests using assert_cmd.
//!
//! These tests verify that the CLI interface works correctly.

mod common;

use assert_cmd::cargo_bin_cmd;
use common::TestContext;
use predicates::prelude::*;

fn age_recipient() -> String {
    age::x25519::Identity::generate().to_public().to_string()
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Salt pillar"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_invalid_command() {
    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("nonexistent-command").assert().failure();
}

#[test]
fn test_cli_rejects_unknown_backend() {
    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.args(["sync", "--backend", "consul"]).assert().failure();
}

#[test]
fn test_doctor_reports_missing_config() {
    let ctx = TestContext::new().unwrap();

    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("doctor")
        .arg("--config")
        .arg(ctx.path("missing.yaml"))
        .env_remove("PILLAR_SYNC_CONFIG")
        .assert()
        .failure()
        .stdout(predicates::str::contains("Pillar Sync Doctor"))
        .stdout(predicates::str::contains("Skipped"));
}

#[test]
fn test_sync_missing_config_exits_with_config_code() {
    let ctx = TestContext::new().unwrap();

    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("sync")
        .arg("--config")
        .arg(ctx.path("missing.yaml"))
        .assert()
        .code(1)
        .stderr(predicates::str::contains("Failed to load config"));
}

#[test]
fn test_config_path_from_environment() {
    let ctx = TestContext::new().unwrap();

    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("show-config")
        .env("PILLAR_SYNC_CONFIG", ctx.path("from-env.yaml"))
        .assert()
        .code(1)
        .stderr(predicates::str::contains("from-env.yaml"));
}

#[test]
fn test_show_config_redacts_token() {
    let ctx = TestContext::new().unwrap();
    let repo = ctx.path("pillar");
    std::fs::create_dir_all(&repo).unwrap();
    let config = ctx
        .write_vault_age_config("https://vault.example.com:8200", &age_recipient(), &repo)
        .unwrap();

    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("show-config")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicates::str::contains("[REDACTED]"))
        .stdout(predicates::str::contains(common::VAULT_TEST_TOKEN).not());
}

#[test]
fn test_sync_unreachable_vault_writes_nothing() {
    let ctx = TestContext::new().unwrap();
    let repo = ctx.path("pillar");
    std::fs::create_dir_all(&repo).unwrap();
    let config = ctx
        .write_vault_age_config("http://127.0.0.1:1", &age_recipient(), &repo)
        .unwrap();

    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("sync")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicates::str::contains("Failed to fetch secrets from Vault"));

    assert!(!repo.join("client_credentials.sls").exists());
}

#[test]
fn test_sync_invalid_age_recipient_exits_with_encryption_code() {
    let ctx = TestContext::new().unwrap();
    let repo = ctx.path("pillar");
    std::fs::create_dir_all(&repo).unwrap();
    let config = ctx
        .write_vault_age_config("http://127.0.0.1:1", "saltmaster@example.com", &repo)
        .unwrap();

    let mut cmd = cargo_bin_cmd!("pillar-sync");
    cmd.arg("sync")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(3)
        .stderr(predicates::str::contains("invalid age recipient"));

    assert!(!repo.join("client_credentials.sls").exists());
}
