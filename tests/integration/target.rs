use super::*;
use lock_patcher::{LockError, LockFileError, Spec};
use pretty_assertions::assert_eq;

fn upgrade(file: &str) -> Spec {
    Spec {
        value: "2.23.0".to_string(),
        ..spec("hashicorp/kubernetes", file)
    }
}

fn upgrade_all(files: &[&str]) -> Spec {
    Spec {
        file: String::new(),
        files: files.iter().map(|f| f.to_string()).collect(),
        ..upgrade("")
    }
}

fn with_constraints(content: &str, version: &str) -> String {
    content.replacen(
        &format!("  version = \"{version}\"\n"),
        &format!("  version = \"{version}\"\n  constraints = \"~> 2.21\"\n"),
        1,
    )
}

#[test]
fn upgrade_rewrites_version_and_hashes() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(upgrade(LOCK_FILE), kubernetes_oracle());

    let report = lock.target("", &workdir(&dir), false).unwrap();

    assert!(report.changed);
    assert!(!report.dry_run);
    assert_eq!(report.changed_files().collect::<Vec<_>>(), vec![LOCK_FILE]);
    assert_eq!(report.files[0].old_version, "2.22.0");
    assert_eq!(report.files[0].new_version, "2.23.0");
    assert_eq!(
        report.description,
        "terraform/lock: provider \"hashicorp/kubernetes\" updated from \"2.22.0\" to \"2.23.0\" in file \".terraform.lock.hcl\""
    );
    assert_eq!(read(dir.path(), LOCK_FILE), expected());

    let state = lock.query(LOCK_FILE, &workdir(&dir)).unwrap();
    assert_eq!(state.hashes, strings(KUBERNETES_2_23_0));
}

#[test]
fn second_run_reports_no_change() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(upgrade(LOCK_FILE), kubernetes_oracle());

    assert!(lock.target("", &workdir(&dir), false).unwrap().changed);
    let second = lock.target("", &workdir(&dir), false).unwrap();

    assert!(!second.changed);
    assert_eq!(second.changed_files().count(), 0);
    assert!(second.description.contains("already set to \"2.23.0\""));
    assert_eq!(read(dir.path(), LOCK_FILE), expected());
}

#[test]
fn dry_run_never_writes() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(upgrade(LOCK_FILE), kubernetes_oracle());

    let report = lock.target("", &workdir(&dir), true).unwrap();

    assert!(report.changed);
    assert!(report.dry_run);
    assert!(report.description.contains("would be updated"));
    assert_eq!(report.files[0].before, fixture());
    assert_eq!(report.files[0].after, expected());
    assert_eq!(read(dir.path(), LOCK_FILE), fixture());
}

#[test]
fn dry_run_on_consistent_file_reports_no_change() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), LOCK_FILE, &expected());
    let lock = resource(upgrade(LOCK_FILE), kubernetes_oracle());

    let report = lock.target("", &workdir(&dir), true).unwrap();
    assert!(!report.changed);
    assert_eq!(read(dir.path(), LOCK_FILE), expected());
}

#[test]
fn skip_constraints_keeps_existing_constraint() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), LOCK_FILE, &with_constraints(&fixture(), "2.22.0"));
    let lock = resource(
        Spec {
            skipconstraints: true,
            ..upgrade(LOCK_FILE)
        },
        kubernetes_oracle(),
    );

    assert!(lock.target("", &workdir(&dir), false).unwrap().changed);

    assert_eq!(
        read(dir.path(), LOCK_FILE),
        with_constraints(&expected(), "2.23.0")
    );
    let state = lock.query(LOCK_FILE, &workdir(&dir)).unwrap();
    assert_eq!(state.version, "2.23.0");
    assert_eq!(state.constraints.as_deref(), Some("~> 2.21"));
}

#[test]
fn constraints_follow_version_by_default() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), LOCK_FILE, &with_constraints(&fixture(), "2.22.0"));
    let lock = resource(upgrade(LOCK_FILE), kubernetes_oracle());

    lock.target("", &workdir(&dir), false).unwrap();

    let state = lock.query(LOCK_FILE, &workdir(&dir)).unwrap();
    assert_eq!(state.constraints.as_deref(), Some("2.23.0"));
}

#[test]
fn changed_is_or_across_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "stale/.terraform.lock.hcl", &fixture());
    write(dir.path(), "current/.terraform.lock.hcl", &expected());
    let lock = resource(
        upgrade_all(&["stale/.terraform.lock.hcl", "current/.terraform.lock.hcl"]),
        kubernetes_oracle(),
    );

    let report = lock.target("", &workdir(&dir), false).unwrap();

    assert!(report.changed);
    assert_eq!(report.files.len(), 2);
    assert!(report.files[0].changed);
    assert!(!report.files[1].changed);
    assert_eq!(
        report.changed_files().collect::<Vec<_>>(),
        vec!["stale/.terraform.lock.hcl"]
    );
    assert_eq!(read(dir.path(), "stale/.terraform.lock.hcl"), expected());
    assert_eq!(read(dir.path(), "current/.terraform.lock.hcl"), expected());
}

#[test]
fn files_are_processed_in_configuration_order() {
    let paths = ["z/.terraform.lock.hcl", "a/.terraform.lock.hcl", "m/.terraform.lock.hcl"];
    let dir = workspace(&paths);
    let lock = resource(upgrade_all(&paths), kubernetes_oracle());

    let report = lock.target("", &workdir(&dir), true).unwrap();
    let order: Vec<_> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(order, paths);
}

#[test]
fn repeated_file_is_reported_once() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(upgrade_all(&[LOCK_FILE, LOCK_FILE]), kubernetes_oracle());

    let report = lock.target("", &workdir(&dir), true).unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].path, LOCK_FILE);
    assert!(report.files[0].changed);
}

#[test]
fn registry_is_queried_once_per_run() {
    let paths = ["a/.terraform.lock.hcl", "b/.terraform.lock.hcl"];
    let dir = workspace(&paths);
    let oracle = CountingOracle::new(kubernetes_oracle());
    let lock = resource(upgrade_all(&paths), &oracle);

    let report = lock.target("", &workdir(&dir), false).unwrap();
    assert_eq!(report.changed_files().count(), 2);
    assert_eq!(oracle.calls.get(), 1);
}

#[test]
fn missing_provider_block_aborts_without_writing() {
    let dir = workspace(&[LOCK_FILE]);
    let oracle = CountingOracle::new(kubernetes_oracle());
    let lock = resource(
        Spec {
            value: "3.2.1".to_string(),
            ..spec("hashicorp/null", LOCK_FILE)
        },
        &oracle,
    );

    let err = lock.target("", &workdir(&dir), false).unwrap_err();
    assert!(matches!(
        err,
        LockError::LockFile(LockFileError::ProviderBlockNotFound { .. })
    ));
    assert_eq!(oracle.calls.get(), 0);
    assert_eq!(read(dir.path(), LOCK_FILE), fixture());
}

#[test]
fn url_paths_are_rejected_before_reading() {
    let lock = resource(
        upgrade("https://example.com/.terraform.lock.hcl"),
        kubernetes_oracle(),
    );

    let err = lock.target("", "", false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "URL scheme is not supported for HCL target: \"https://example.com/.terraform.lock.hcl\""
    );
}

#[test]
fn file_scheme_prefix_is_stripped() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(upgrade("file://.terraform.lock.hcl"), kubernetes_oracle());

    let report = lock.target("", &workdir(&dir), false).unwrap();
    assert_eq!(report.files[0].path, LOCK_FILE);
    assert_eq!(read(dir.path(), LOCK_FILE), expected());
}

#[test]
fn unrelated_blocks_survive_a_noop_run() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(
        Spec {
            value: "2.22.0".to_string(),
            ..spec("hashicorp/kubernetes", LOCK_FILE)
        },
        kubernetes_oracle(),
    );

    let report = lock.target("", &workdir(&dir), false).unwrap();
    assert!(!report.changed);
    assert_eq!(read(dir.path(), LOCK_FILE), fixture());
}
