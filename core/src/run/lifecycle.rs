use crate::audit::event::{Actor, AuditEvent};
use crate::audit::log::AuditLog;
use crate::compliance::ComplianceSnapshot;
use crate::error::CoreResult;
use crate::traceability::TraceabilityAuditor;
use crate::validator::result::{ArtifactStatus, ValidationResult, ViolationKind};
use crate::vocabulary::Vocabulary;
use serde_json::json;

pub fn emit_run_started(
    audit: &mut AuditLog,
    run_id: &str,
    governed_root: &str,
    ts_utc: &str,
) -> CoreResult<()> {
    audit.append(AuditEvent::new(
        ts_utc,
        "RUN_STARTED",
        run_id,
        Actor::Operator,
        json!({ "governed_root": governed_root }),
    ))?;
    Ok(())
}

pub fn emit_vocabulary_loaded(
    audit: &mut AuditLog,
    run_id: &str,
    vocabulary: &Vocabulary,
    ts_utc: &str,
) -> CoreResult<()> {
    audit.append(AuditEvent::new(
        ts_utc,
        "VOCABULARY_LOADED",
        run_id,
        Actor::Engine,
        json!({
            "vocabulary_version": vocabulary.version(),
            "vocabulary_sha256": vocabulary.sha256(),
            "required_fields": vocabulary.required_fields().len(),
        }),
    ))?;
    Ok(())
}

pub fn emit_record_sets_loaded(
    audit: &mut AuditLog,
    run_id: &str,
    auditor: &TraceabilityAuditor,
    ts_utc: &str,
) -> CoreResult<()> {
    let sets: Vec<_> = auditor
        .record_sets()
        .iter()
        .map(|rs| json!({ "name": rs.name(), "records": rs.len() }))
        .collect();
    audit.append(AuditEvent::new(
        ts_utc,
        "RECORD_SETS_LOADED",
        run_id,
        Actor::Engine,
        json!({ "record_sets": sets }),
    ))?;
    Ok(())
}

/// ARTIFACT_FAILED for failing artifacts, DRIFT_DETECTED whenever drift was seen. Passing
/// artifacts without drift leave no trace in the log.
pub fn emit_artifact_outcome(
    audit: &mut AuditLog,
    run_id: &str,
    result: &ValidationResult,
    ts_utc: &str,
) -> CoreResult<()> {
    if result.status() == ArtifactStatus::FAIL {
        let kinds: Vec<&str> = result.violations().iter().map(|v| v.kind.as_str()).collect();
        audit.append(AuditEvent::new(
            ts_utc,
            "ARTIFACT_FAILED",
            run_id,
            Actor::Engine,
            json!({ "artifact": result.artifact(), "violations": kinds }),
        ))?;
    }
    let drifted: Vec<&str> = result
        .violations()
        .iter()
        .filter(|v| v.kind == ViolationKind::EnumDrift)
        .filter_map(|v| v.field.as_deref())
        .collect();
    if !drifted.is_empty() {
        audit.append(AuditEvent::new(
            ts_utc,
            "DRIFT_DETECTED",
            run_id,
            Actor::Engine,
            json!({ "artifact": result.artifact(), "fields": drifted }),
        ))?;
    }
    Ok(())
}

pub fn emit_run_completed(audit: &mut AuditLog, snapshot: &ComplianceSnapshot) -> CoreResult<()> {
    audit.append(AuditEvent::new(
        &snapshot.generated_at,
        "RUN_COMPLETED",
        &snapshot.run_id,
        Actor::Engine,
        json!({
            "total_scanned": snapshot.total_scanned,
            "compliant": snapshot.compliant,
            "failing": snapshot.failing,
            "exempt": snapshot.exempt,
            "drift_attempts": snapshot.drift_attempts,
        }),
    ))?;
    Ok(())
}

pub fn emit_run_failed(
    audit: &mut AuditLog,
    run_id: &str,
    reason: &str,
    ts_utc: &str,
) -> CoreResult<()> {
    audit.append(AuditEvent::new(
        ts_utc,
        "RUN_FAILED",
        run_id,
        Actor::Engine,
        json!({ "reason": reason }),
    ))?;
    Ok(())
}
