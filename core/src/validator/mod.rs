pub mod result;

use crate::header::ArtifactPath;
use crate::policy::types::DriftPolicy;
use crate::resolve::{EffectiveHeader, Provenance};
use crate::validator::result::{HeaderState, ValidationResult, Violation, ViolationKind};
use crate::vocabulary::Vocabulary;
use serde_json::Value;

/// Schema, drift and identity checks over a resolved header.
pub fn validate(
    artifact: &ArtifactPath,
    header: HeaderState,
    effective: &EffectiveHeader,
    vocabulary: &Vocabulary,
    drift_policy: DriftPolicy,
) -> ValidationResult {
    let mut violations = check_required_fields(effective, vocabulary);
    violations.extend(check_enum_drift(effective, vocabulary, drift_policy));
    violations.extend(check_identity(artifact, effective, vocabulary));
    ValidationResult::new(
        artifact,
        header,
        effective.explicit_count(),
        effective.inherited_count(),
        violations,
    )
}

fn check_required_fields(effective: &EffectiveHeader, vocabulary: &Vocabulary) -> Vec<Violation> {
    let mut out = Vec::new();
    for name in vocabulary.required_fields() {
        let Some(field) = effective.field(name) else {
            out.push(Violation::blocker(
                ViolationKind::MissingRequired,
                Some(name),
                format!("required field `{}` is missing", name),
            ));
            continue;
        };
        if !is_nonempty_scalar(&field.value) {
            let origin = match &field.provenance {
                Provenance::Explicit => "declared".to_string(),
                Provenance::Inherited { source } => format!("inherited from {}", source.display()),
            };
            out.push(Violation::blocker(
                ViolationKind::EmptyRequired,
                Some(name),
                format!(
                    "required field `{}` is {} without a non-empty scalar value",
                    name, origin
                ),
            ));
        }
    }
    out
}

fn check_enum_drift(
    effective: &EffectiveHeader,
    vocabulary: &Vocabulary,
    drift_policy: DriftPolicy,
) -> Vec<Violation> {
    let mut out = Vec::new();
    for field in effective.fields() {
        let Some(allowed) = vocabulary.enumeration(&field.name) else {
            continue;
        };
        let unknown: Vec<String> = value_strings(&field.value)
            .into_iter()
            .filter(|v| !vocabulary.is_member(&field.name, v))
            .collect();
        if unknown.is_empty() {
            continue;
        }
        let message = format!(
            "`{}` value(s) [{}] not in vocabulary {} enumeration [{}]",
            field.name,
            unknown.join(", "),
            vocabulary.version(),
            allowed.join(", ")
        );
        out.push(Violation {
            kind: ViolationKind::EnumDrift,
            severity: drift_policy.drift_severity(),
            field: Some(field.name.clone()),
            message,
        });
    }
    out
}

fn check_identity(
    artifact: &ArtifactPath,
    effective: &EffectiveHeader,
    vocabulary: &Vocabulary,
) -> Option<Violation> {
    let id_field = vocabulary.identity_field()?;
    let id = scalar_string(effective.get(id_field)?)?;
    if id.trim().is_empty() {
        return None;
    }
    let file_name = artifact.file_name();
    if file_name.contains(id.as_str()) {
        return None;
    }
    Some(Violation::blocker(
        ViolationKind::IdentityMismatch,
        Some(id_field),
        format!(
            "`{}` value `{}` does not appear in file name `{}`",
            id_field, id, file_name
        ),
    ))
}

/// True for strings with visible content, numbers and booleans.
pub fn is_nonempty_scalar(v: &Value) -> bool {
    match v {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) | Value::Bool(_) => true,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Values compared against an enumeration; empty values are not drift.
fn value_strings(v: &Value) -> Vec<String> {
    match v {
        Value::Null => Vec::new(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::Array(items) => items.iter().flat_map(value_strings).collect(),
        Value::Object(_) => vec![v.to_string()],
        other => scalar_string(other).into_iter().collect(),
    }
}
