use super::*;
use lock_patcher::{LockError, LockFileError, Spec, StoreError};

#[test]
fn matching_version_and_hashes_pass() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(
        Spec {
            value: "2.22.0".to_string(),
            ..spec("hashicorp/kubernetes", LOCK_FILE)
        },
        kubernetes_oracle(),
    );

    let outcome = lock.condition("", &workdir(&dir)).unwrap();
    assert!(outcome.pass);
    assert_eq!(outcome.current_version, "2.22.0");
    assert_eq!(
        outcome.message,
        "terraform/lock: provider \"hashicorp/kubernetes\" in file \".terraform.lock.hcl\" is correctly set to \"2.22.0\""
    );
}

#[test]
fn newer_version_fails_with_both_versions_in_message() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(
        Spec {
            value: "2.23.0".to_string(),
            ..spec("hashicorp/kubernetes", LOCK_FILE)
        },
        kubernetes_oracle(),
    );

    let outcome = lock.condition("", &workdir(&dir)).unwrap();
    assert!(!outcome.pass);
    assert!(!outcome.decision.matches_version);
    assert!(outcome.message.contains("is incorrectly set to \"2.22.0\""));
    assert!(outcome.message.contains("should be \"2.23.0\""));

    // Condition never writes
    assert_eq!(read(dir.path(), LOCK_FILE), fixture());
}

#[test]
fn source_value_is_used_when_no_explicit_value() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(spec("hashicorp/kubernetes", LOCK_FILE), kubernetes_oracle());

    assert!(lock.condition("2.22.0", &workdir(&dir)).unwrap().pass);
    assert!(!lock.condition("2.23.0", &workdir(&dir)).unwrap().pass);
}

#[test]
fn reordered_hashes_are_a_mismatch() {
    let dir = TempDir::new().unwrap();
    let mut reordered = strings(KUBERNETES_2_22_0);
    reordered.swap(1, 2);
    let content = fixture().replacen(KUBERNETES_2_22_0[1], "SWAP", 1);
    let content = content
        .replacen(KUBERNETES_2_22_0[2], KUBERNETES_2_22_0[1], 1)
        .replacen("SWAP", KUBERNETES_2_22_0[2], 1);
    write(dir.path(), LOCK_FILE, &content);

    let lock = resource(
        Spec {
            value: "2.22.0".to_string(),
            ..spec("hashicorp/kubernetes", LOCK_FILE)
        },
        kubernetes_oracle(),
    );

    let outcome = lock.condition("", &workdir(&dir)).unwrap();
    assert!(!outcome.pass);
    assert!(outcome.decision.matches_version);
    assert!(!outcome.decision.matches_hashes);
    assert!(outcome.message.contains("hashes in file"));

    let state = lock.query(LOCK_FILE, &workdir(&dir)).unwrap();
    assert_eq!(state.hashes, reordered);
}

#[test]
fn fully_qualified_provider_matches_short_label() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        LOCK_FILE,
        &fixture().replace(
            "provider \"registry.terraform.io/hashicorp/kubernetes\"",
            "provider \"hashicorp/kubernetes\"",
        ),
    );

    let lock = resource(
        Spec {
            value: "2.22.0".to_string(),
            ..spec("registry.terraform.io/hashicorp/kubernetes", LOCK_FILE)
        },
        kubernetes_oracle(),
    );
    assert!(lock.condition("", &workdir(&dir)).unwrap().pass);
}

#[test]
fn missing_provider_block_is_an_error_before_querying() {
    let dir = workspace(&[LOCK_FILE]);
    let oracle = CountingOracle::new(kubernetes_oracle());
    let lock = resource(
        Spec {
            value: "3.2.1".to_string(),
            ..spec("hashicorp/null", LOCK_FILE)
        },
        &oracle,
    );

    let err = lock.condition("", &workdir(&dir)).unwrap_err();
    assert!(matches!(
        err,
        LockError::LockFile(LockFileError::ProviderBlockNotFound { .. })
    ));
    assert_eq!(
        err.to_string(),
        "cannot find value for \"registry.terraform.io/hashicorp/null\" from file \".terraform.lock.hcl\""
    );
    assert_eq!(oracle.calls.get(), 0);
}

#[test]
fn missing_file_reports_resolved_path() {
    let dir = TempDir::new().unwrap();
    let lock = resource(
        Spec {
            value: "2.22.0".to_string(),
            ..spec("hashicorp/kubernetes", "nope.hcl")
        },
        kubernetes_oracle(),
    );

    let err = lock.condition("", &workdir(&dir)).unwrap_err();
    let resolved = dir.path().join("nope.hcl").to_string_lossy().into_owned();
    assert!(matches!(err, LockError::Store(StoreError::FileMissing { .. })));
    assert_eq!(
        err.to_string(),
        format!("The specified file {resolved:?} does not exist")
    );
}

#[test]
fn more_than_one_file_is_rejected() {
    let dir = workspace(&["a/.terraform.lock.hcl", "b/.terraform.lock.hcl"]);
    let lock = resource(
        Spec {
            file: String::new(),
            files: vec![
                "a/.terraform.lock.hcl".to_string(),
                "b/.terraform.lock.hcl".to_string(),
            ],
            value: "2.22.0".to_string(),
            ..spec("hashicorp/kubernetes", "")
        },
        kubernetes_oracle(),
    );

    let err = lock.condition("", &workdir(&dir)).unwrap_err();
    assert!(matches!(err, LockError::TooManyFiles { count: 2 }));
}

#[test]
fn repeated_file_counts_once() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(
        Spec {
            file: String::new(),
            files: vec![LOCK_FILE.to_string(), format!("file://{LOCK_FILE}")],
            value: "2.22.0".to_string(),
            ..spec("hashicorp/kubernetes", "")
        },
        kubernetes_oracle(),
    );

    let outcome = lock.condition("", &workdir(&dir)).unwrap();
    assert!(outcome.pass);
    assert_eq!(outcome.file, LOCK_FILE);
}

#[test]
fn unknown_version_surfaces_oracle_context() {
    let dir = workspace(&[LOCK_FILE]);
    let lock = resource(
        Spec {
            value: "9.9.9".to_string(),
            ..spec("hashicorp/kubernetes", LOCK_FILE)
        },
        kubernetes_oracle(),
    );

    let err = lock.condition("", &workdir(&dir)).unwrap_err();
    assert!(matches!(err, LockError::Oracle { .. }));
    assert!(err.to_string().starts_with(
        "failed to query provider locks for provider: \"hashicorp/kubernetes\", version: \"9.9.9\", platforms: [\"linux_amd64\"]"
    ));
}
