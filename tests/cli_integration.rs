//! Integration tests for the command-line interface.
//!
//! Only exercises paths that finish before any registry request.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

const LOCK_FILE: &str = ".terraform.lock.hcl";

/// Helper to create a working directory holding the fixture lock file
fn setup_test_workdir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::copy("tests/fixtures/terraform.lock.hcl", dir.path().join(LOCK_FILE)).unwrap();
    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lock-patcher"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute lock-patcher")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_apply_help() {
    let output = run(&["apply", "--help"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("Rewrite lock files to the desired version and hashes"));
    assert!(stdout.contains("--dry-run"));
    assert!(stdout.contains("--discover"));
}

#[test]
fn test_show_command() {
    let dir = setup_test_workdir();
    let workdir = dir.path().to_str().unwrap();

    let output = run(&[
        "show",
        "--file",
        LOCK_FILE,
        "--provider",
        "hashicorp/kubernetes",
        "--platform",
        "linux_amd64",
        "--workdir",
        workdir,
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("registry.terraform.io/hashicorp/kubernetes"));
    assert!(stdout.contains("version:     2.22.0"));
    assert!(stdout.contains("hashes:      13"));
    assert!(stdout.contains("h1:b6Wj111/wsMNg8FrHFXrf4mCZFtSXKHx4JvbZh3YTCY="));
}

#[test]
fn test_show_missing_provider_block() {
    let dir = setup_test_workdir();
    let workdir = dir.path().to_str().unwrap();

    let output = run(&[
        "show",
        "--file",
        LOCK_FILE,
        "--provider",
        "hashicorp/null",
        "--workdir",
        workdir,
    ]);

    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains(
        "cannot find value for \"registry.terraform.io/hashicorp/null\" from file \".terraform.lock.hcl\""
    ));
    assert!(stderr.contains("CONFLICT"));
}

#[test]
fn test_check_rejects_multiple_files() {
    let output = run(&[
        "check",
        "--file",
        "a/.terraform.lock.hcl",
        "--file",
        "b/.terraform.lock.hcl",
        "--provider",
        "hashicorp/kubernetes",
        "--value",
        "2.23.0",
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("terraform/lock condition only supports one file"));
}

#[test]
fn test_check_requires_provider() {
    let output = run(&["check", "--file", LOCK_FILE, "--value", "2.23.0"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("terraform/lock provider undefined"));
}

#[test]
fn test_check_requires_a_version() {
    let dir = setup_test_workdir();
    let output = run(&[
        "check",
        "--file",
        LOCK_FILE,
        "--provider",
        "hashicorp/kubernetes",
        "--workdir",
        dir.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("no version to reconcile"));
}

#[test]
fn test_apply_rejects_urls() {
    let output = run(&[
        "apply",
        "--file",
        "https://example.com/.terraform.lock.hcl",
        "--provider",
        "hashicorp/kubernetes",
        "--value",
        "2.23.0",
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output)
        .contains("URL scheme is not supported for HCL target: \"https://example.com/.terraform.lock.hcl\""));
    assert!(stdout(&output).contains("Summary:"));
}

#[test]
fn test_apply_missing_file_leaves_nothing_behind() {
    let dir = TempDir::new().unwrap();
    let output = run(&[
        "apply",
        "--dry-run",
        "--file",
        LOCK_FILE,
        "--provider",
        "hashicorp/kubernetes",
        "--value",
        "2.23.0",
        "--workdir",
        dir.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(stdout(&output).contains("DRY RUN"));
    assert!(stderr(&output).contains("does not exist"));
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_discover_requires_lock_files() {
    let dir = TempDir::new().unwrap();
    let output = run(&[
        "apply",
        "--discover",
        dir.path().to_str().unwrap(),
        "--provider",
        "hashicorp/kubernetes",
        "--value",
        "2.23.0",
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("No .terraform.lock.hcl files found"));
}

#[test]
fn test_manifest_show() {
    let dir = setup_test_workdir();
    let manifest = dir.path().join("locks.toml");
    fs::write(
        &manifest,
        format!(
            r#"workdir = "{}"

[[locks]]
id = "kubernetes"
file = "file://.terraform.lock.hcl"
provider = "hashicorp/kubernetes"
platforms = ["linux_amd64"]

[[locks]]
id = "tls"
file = ".terraform.lock.hcl"
provider = "hashicorp/tls"
platforms = ["linux_amd64"]
"#,
            dir.path().display()
        ),
    )
    .unwrap();
    let manifest = manifest.to_str().unwrap();

    let output = run(&["show", "--config", manifest]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("version:     2.22.0"));
    assert!(stdout.contains("version:     4.0.4"));

    let output = run(&["show", "--config", manifest, "--lock", "tls"]);
    assert!(output.status.success());
    assert!(!crate::stdout(&output).contains("2.22.0"));

    let output = run(&["show", "--config", manifest, "--lock", "missing"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No lock with id \"missing\""));
}

#[test]
fn test_config_conflicts_with_spec_flags() {
    let output = run(&["check", "--config", "locks.toml", "--provider", "hashicorp/null"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("cannot be used with"));
}
