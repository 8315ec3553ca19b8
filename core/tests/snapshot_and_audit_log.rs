use metagov_core::audit::log::{verify_chain, AuditLog, ChainStatus};
use metagov_core::compliance::failures_csv::render_failures_csv;
use metagov_core::compliance::aggregate;
use metagov_core::config::AuditConfig;
use metagov_core::error::CoreError;
use metagov_core::header::{ArtifactPath, FormatHint};
use metagov_core::run::engine::{ArtifactInput, AuditEngine};
use metagov_core::validator::result::{HeaderState, ValidationResult, Violation, ViolationKind};
use metagov_core::vocabulary::{SourceFormat, Vocabulary};
use std::fs;
use std::path::Path;

fn artifact(rel: &str) -> ArtifactPath {
    ArtifactPath::new(
        Path::new("/repo"),
        Path::new("/repo").join(rel),
        FormatHint::Document,
    )
}

#[test]
fn aggregate_counts_every_outcome() {
    let vocab = Vocabulary::parse(
        r#"{"vocabulary_version": "vocab_v3", "required_fields": ["owner"]}"#,
        SourceFormat::Json,
    )
    .unwrap();
    let results = vec![
        ValidationResult::new(&artifact("policies/a.md"), HeaderState::Found, 2, 1, vec![]),
        ValidationResult::new(
            &artifact("policies/b.md"),
            HeaderState::Found,
            1,
            0,
            vec![Violation::advisory(ViolationKind::EnumDrift, Some("status"), "drift")],
        ),
        ValidationResult::new(
            &artifact("runbooks/c.md"),
            HeaderState::NotFound,
            0,
            0,
            vec![Violation::blocker(ViolationKind::MissingRequired, Some("owner"), "missing")],
        ),
        ValidationResult::malformed(&artifact("policies/0-first.md"), "bad marker"),
        ValidationResult::exempt(&artifact("runbooks/template.md")),
    ];

    let snap = aggregate("r_test", &vocab, &results, "2026-02-10T00:00:00Z".to_string());
    assert_eq!(snap.total_scanned, 5);
    assert_eq!(snap.compliant, 2);
    assert_eq!(snap.failing, 2);
    assert_eq!(snap.exempt, 1);
    assert_eq!(snap.explicit_field_count, 3);
    assert_eq!(snap.inherited_field_count, 1);
    assert_eq!(snap.drift_attempts, 1);
    assert_eq!(snap.vocabulary_version, "vocab_v3");
    assert_eq!(snap.violation_counts.get("missing_required"), Some(&1));
    assert_eq!(snap.zones["policies"].scanned, 3);
    assert_eq!(snap.zones["runbooks"].exempt, 1);
    let failing: Vec<_> = snap.failures.iter().map(|f| f.artifact.as_str()).collect();
    assert_eq!(failing, vec!["policies/0-first.md", "runbooks/c.md"]);
    assert!(!snap.all_compliant());

    let csv = render_failures_csv(&snap).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("artifact,zone,kind,severity,field,message"));
    assert_eq!(
        lines.next(),
        Some("policies/0-first.md,policies,malformed_header,BLOCKER,,malformed header: bad marker")
    );
    assert_eq!(lines.count(), 1);
}

#[test]
fn run_writes_a_verifiable_event_chain() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("vocabulary.json"),
        r#"{"vocabulary_version": "v1", "required_fields": ["owner"], "enums": {"status": ["active"]}}"#,
    )
    .unwrap();
    let cfg = AuditConfig::new(root, root.join("vocabulary.json"));
    let engine = AuditEngine::from_config(&cfg).unwrap();
    let log_path = root.join("logs/audit.ndjson");
    let mut log = AuditLog::open_or_create(&log_path).unwrap();

    let inputs = vec![
        ("docs/ok.md", "---\nowner: a\n---\n"),
        ("docs/drift.md", "---\nowner: a\nstatus: retired\n---\n"),
        ("docs/bad.md", "no header\n"),
    ]
    .into_iter()
    .map(|(rel, text)| {
        ArtifactInput::new(
            ArtifactPath::new(root, root.join(rel), FormatHint::Document),
            text.as_bytes().to_vec(),
        )
    });
    let snap = engine.run(inputs, Some(&mut log), |_| {}).unwrap();
    assert_eq!(snap.failing, 1);
    assert_eq!(snap.run_id, engine.run_id());

    let text = fs::read_to_string(&log_path).unwrap();
    let types: Vec<String> = text
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event_type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(types.first().map(String::as_str), Some("RUN_STARTED"));
    assert_eq!(types.last().map(String::as_str), Some("RUN_COMPLETED"));
    assert!(types.iter().any(|t| t == "VOCABULARY_LOADED"));
    assert_eq!(types.iter().filter(|t| *t == "ARTIFACT_FAILED").count(), 1);
    assert_eq!(types.iter().filter(|t| *t == "DRIFT_DETECTED").count(), 1);
    assert_eq!(verify_chain(&log_path).unwrap(), ChainStatus::Intact { events: types.len() });

    // Reopening resumes the chain.
    drop(log);
    let mut log = AuditLog::open_or_create(&log_path).unwrap();
    engine.run(Vec::<ArtifactInput>::new(), Some(&mut log), |_| {}).unwrap();
    assert!(matches!(verify_chain(&log_path).unwrap(), ChainStatus::Intact { .. }));
}

#[test]
fn tampered_log_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("vocabulary.yaml"),
        "vocabulary_version: v1\nrequired_fields: [owner]\n",
    )
    .unwrap();
    let cfg = AuditConfig::new(root, root.join("vocabulary.yaml"));
    let engine = AuditEngine::from_config(&cfg).unwrap();
    let log_path = root.join("audit.ndjson");
    let mut log = AuditLog::open_or_create(&log_path).unwrap();
    engine.run(Vec::<ArtifactInput>::new(), Some(&mut log), |_| {}).unwrap();

    let text = fs::read_to_string(&log_path).unwrap();
    fs::write(&log_path, text.replacen("\"v1\"", "\"v2\"", 1)).unwrap();
    assert!(matches!(
        verify_chain(&log_path).unwrap(),
        ChainStatus::Broken { line: 2, .. }
    ));
}

#[test]
fn unreadable_vocabulary_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("vocabulary.json"), "{not json").unwrap();
    let cfg = AuditConfig::new(root, root.join("vocabulary.json"));
    let err = AuditEngine::from_config(&cfg).err().unwrap();
    assert!(matches!(err, CoreError::VocabularyLoad(_)));
}

fn event_types(log_path: &Path) -> Vec<String> {
    fs::read_to_string(log_path)
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event_type"].as_str().unwrap().to_string()
        })
        .collect()
}

#[test]
fn unreadable_artifact_fails_alone_and_run_completes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("vocabulary.json"),
        r#"{"vocabulary_version": "v1", "required_fields": ["owner"]}"#,
    )
    .unwrap();
    fs::create_dir_all(root.join("docs/folder.md")).unwrap();
    fs::write(root.join("docs/ok.md"), "---\nowner: a\n---\n").unwrap();
    let cfg = AuditConfig::new(root, root.join("vocabulary.json"));
    let engine = AuditEngine::from_config(&cfg).unwrap();
    let log_path = root.join("audit.ndjson");
    let mut log = AuditLog::open_or_create(&log_path).unwrap();

    let inputs = ["docs/folder.md", "docs/ok.md"].into_iter().map(|rel| {
        ArtifactInput::read(ArtifactPath::new(root, root.join(rel), FormatHint::Document))
    });
    let report = engine.run_collect(inputs, Some(&mut log)).unwrap();
    assert_eq!(report.snapshot.total_scanned, 2);
    assert_eq!(report.snapshot.compliant, 1);
    assert_eq!(report.snapshot.failing, 1);

    let unreadable = &report.results[0];
    assert_eq!(unreadable.artifact(), "docs/folder.md");
    assert_eq!(unreadable.header(), HeaderState::Malformed);
    assert_eq!(unreadable.violations().len(), 1);
    assert_eq!(unreadable.violations()[0].kind, ViolationKind::MalformedHeader);
    assert!(unreadable.violations()[0]
        .message
        .starts_with("cannot read artifact: "));
    assert!(report.results[1].passed());

    let types = event_types(&log_path);
    assert_eq!(types.last().map(String::as_str), Some("RUN_COMPLETED"));
    assert!(!types.iter().any(|t| t == "RUN_FAILED"));
    assert_eq!(verify_chain(&log_path).unwrap(), ChainStatus::Intact { events: types.len() });
}

#[test]
fn read_error_content_becomes_blocker() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("vocabulary.json"),
        r#"{"vocabulary_version": "v1", "required_fields": ["owner"]}"#,
    )
    .unwrap();
    let engine =
        AuditEngine::from_config(&AuditConfig::new(root, root.join("vocabulary.json"))).unwrap();
    let input = ArtifactInput {
        artifact: ArtifactPath::new(root, root.join("docs/locked.md"), FormatHint::Document),
        content: Err("permission denied".to_string()),
    };

    let r = engine.process_artifact(&input).unwrap();
    assert!(!r.passed());
    assert_eq!(r.count_of(ViolationKind::MalformedHeader), 1);
    assert_eq!(
        r.violations()[0].message,
        "cannot read artifact: permission denied"
    );
}

#[test]
fn unreadable_sidecar_ends_run_with_run_failed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("vocabulary.json"),
        r#"{"vocabulary_version": "v1", "required_fields": ["owner"]}"#,
    )
    .unwrap();
    // A directory where a sidecar is expected cannot be read.
    fs::create_dir_all(root.join("docs/_meta.yaml")).unwrap();
    let cfg = AuditConfig::new(root, root.join("vocabulary.json"));
    let engine = AuditEngine::from_config(&cfg).unwrap();
    let log_path = root.join("audit.ndjson");
    let mut log = AuditLog::open_or_create(&log_path).unwrap();

    let inputs = vec![ArtifactInput::new(
        ArtifactPath::new(root, root.join("docs/a.md"), FormatHint::Document),
        b"---\nowner: a\n---\n".to_vec(),
    )];
    let err = engine.run(inputs, Some(&mut log), |_| {}).err().unwrap();
    assert!(matches!(err, CoreError::AncestorCache(_)));

    let types = event_types(&log_path);
    assert_eq!(types.first().map(String::as_str), Some("RUN_STARTED"));
    assert_eq!(types.last().map(String::as_str), Some("RUN_FAILED"));
    assert!(!types.iter().any(|t| t == "RUN_COMPLETED"));
    assert_eq!(verify_chain(&log_path).unwrap(), ChainStatus::Intact { events: types.len() });
}
