use metagov_core::config::AuditConfig;
use metagov_core::error::CoreError;
use metagov_core::policy::types::DriftPolicy;
use std::fs;

#[test]
fn yaml_config_resolves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.yaml");
    fs::write(
        &path,
        "governed_root: repo\n\
         vocabulary_path: governance/vocabulary.yaml\n\
         zones: [decisions, automation]\n\
         drift_policy: FAILING\n\
         workers: 2\n\
         audit_log_path: out/audit.ndjson\n\
         traceability:\n  traceable_extensions: [sh]\n  record_sets:\n    - name: decisions\n      path: decisions\n",
    )
    .unwrap();

    let cfg = AuditConfig::load(&path).unwrap();
    assert_eq!(cfg.governed_root, dir.path().join("repo"));
    assert_eq!(cfg.vocabulary_path, dir.path().join("governance/vocabulary.yaml"));
    assert_eq!(cfg.audit_log_path, Some(dir.path().join("out/audit.ndjson")));
    assert_eq!(
        cfg.traceability.record_sets[0].path,
        dir.path().join("repo/decisions")
    );
    assert_eq!(cfg.traceability.record_sets[0].extensions, vec!["md".to_string()]);
    assert_eq!(cfg.drift_policy, DriftPolicy::FAILING);
    assert_eq!(cfg.workers, 2);
    assert_eq!(cfg.queue_bound, 64);
}

#[test]
fn unknown_keys_and_duplicate_sets_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let typo = dir.path().join("typo.json");
    fs::write(
        &typo,
        r#"{"governed_root": ".", "vocabulary_path": "v.json", "worker": 3}"#,
    )
    .unwrap();
    assert!(matches!(AuditConfig::load(&typo), Err(CoreError::Config(_))));

    let dup = dir.path().join("dup.json");
    fs::write(
        &dup,
        r#"{"governed_root": ".", "vocabulary_path": "v.json",
            "traceability": {"record_sets": [{"name": "a", "path": "x"}, {"name": "a", "path": "y"}]}}"#,
    )
    .unwrap();
    assert!(matches!(AuditConfig::load(&dup), Err(CoreError::Config(_))));
}

#[test]
fn unsupported_config_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.toml");
    fs::write(&path, "governed_root = \".\"\n").unwrap();
    assert!(matches!(AuditConfig::load(&path), Err(CoreError::Config(_))));
}
