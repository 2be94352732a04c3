//! Runs the `debfeed` binary with every writable location redirected into a scratch directory.

use std::{
    fs,
    path::Path,
    process::{Command, Output},
};

use tempfile::TempDir;

fn debfeed(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_debfeed"))
        .args(args)
        .env("DEBFEED_CONFIG", root.join("config.toml"))
        .env("DEBFEED_LOG_FILE", root.join("log/debfeed.log"))
        .env("DEBFEED_KEYRING_DIR", root.join("keyrings"))
        .env("DEBFEED_SOURCES_DIR", root.join("sources.list.d"))
        .env("DEBFEED_AUTH_DIR", root.join("auth.conf.d"))
        .env("DEBFEED_OS_RELEASE", root.join("os-release"))
        .env("DEBFEED_LSB_RELEASE", root.join("lsb-release"))
        .env("HOME", root.join("home"))
        .env("XDG_STATE_HOME", root.join("state"))
        .output()
        .unwrap()
}

fn entries(root: &Path) -> Vec<String> {
    fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_bootstrap_empty_user_exits_without_writing() {
    let dir = TempDir::new().unwrap();

    let output = debfeed(dir.path(), &["--no-color", "bootstrap", "", "s3cret"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("user"));
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn test_bootstrap_empty_token_exits_without_writing() {
    let dir = TempDir::new().unwrap();

    let output = debfeed(dir.path(), &["--no-color", "bootstrap", "deploy", ""]);

    assert_eq!(output.status.code(), Some(1));
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn test_bootstrap_missing_arguments_is_usage_error() {
    let dir = TempDir::new().unwrap();

    let output = debfeed(dir.path(), &["bootstrap", "deploy"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn test_redirected_environment_receives_writes() {
    let dir = TempDir::new().unwrap();

    let output = debfeed(dir.path(), &["defconfig"]);

    assert!(output.status.success());
    assert_eq!(entries(dir.path()), vec!["config.toml"]);
}
