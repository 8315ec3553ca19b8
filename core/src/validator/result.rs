use crate::header::ArtifactPath;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingRequired,
    EmptyRequired,
    EnumDrift,
    MalformedHeader,
    MissingTrace,
    IdentityMismatch,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::MissingRequired => "missing_required",
            ViolationKind::EmptyRequired => "empty_required",
            ViolationKind::EnumDrift => "enum_drift",
            ViolationKind::MalformedHeader => "malformed_header",
            ViolationKind::MissingTrace => "missing_trace",
            ViolationKind::IdentityMismatch => "identity_mismatch",
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    BLOCKER,
    ADVISORY,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn blocker(kind: ViolationKind, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::BLOCKER,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn advisory(kind: ViolationKind, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::ADVISORY,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ArtifactStatus {
    PASS,
    FAIL,
    EXEMPT,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeaderState {
    Found,
    NotFound,
    Malformed,
    Skipped,
}

/// Outcome for one artifact. Built once and never changed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    artifact: String,
    zone: String,
    status: ArtifactStatus,
    header: HeaderState,
    explicit_fields: usize,
    inherited_fields: usize,
    violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn new(
        artifact: &ArtifactPath,
        header: HeaderState,
        explicit_fields: usize,
        inherited_fields: usize,
        violations: Vec<Violation>,
    ) -> Self {
        Self {
            artifact: artifact.rel_path.clone(),
            zone: artifact.zone.clone(),
            status: status_for(&violations),
            header,
            explicit_fields,
            inherited_fields,
            violations,
        }
    }

    pub fn malformed(artifact: &ArtifactPath, diagnostic: &str) -> Self {
        Self::new(
            artifact,
            HeaderState::Malformed,
            0,
            0,
            vec![Violation::blocker(
                ViolationKind::MalformedHeader,
                None,
                format!("malformed header: {}", diagnostic),
            )],
        )
    }

    pub fn exempt(artifact: &ArtifactPath) -> Self {
        Self {
            artifact: artifact.rel_path.clone(),
            zone: artifact.zone.clone(),
            status: ArtifactStatus::EXEMPT,
            header: HeaderState::Skipped,
            explicit_fields: 0,
            inherited_fields: 0,
            violations: Vec::new(),
        }
    }

    /// Fold `other`'s violations into this result. Field counts come from `self`.
    pub fn merge(self, other: ValidationResult) -> Self {
        let mut violations = self.violations;
        violations.extend(other.violations);
        Self {
            status: status_for(&violations),
            violations,
            ..self
        }
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn status(&self) -> ArtifactStatus {
        self.status
    }

    pub fn passed(&self) -> bool {
        self.status != ArtifactStatus::FAIL
    }

    pub fn header(&self) -> HeaderState {
        self.header
    }

    pub fn explicit_fields(&self) -> usize {
        self.explicit_fields
    }

    pub fn inherited_fields(&self) -> usize {
        self.inherited_fields
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn count_of(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }
}

fn status_for(violations: &[Violation]) -> ArtifactStatus {
    if violations.iter().any(|v| v.severity == Severity::BLOCKER) {
        ArtifactStatus::FAIL
    } else {
        ArtifactStatus::PASS
    }
}
