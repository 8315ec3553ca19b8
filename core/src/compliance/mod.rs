pub mod failures_csv;

use crate::validator::result::{ArtifactStatus, ValidationResult, Violation, ViolationKind};
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureRecord {
    pub artifact: String,
    pub zone: String,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneCounts {
    pub scanned: usize,
    pub compliant: usize,
    pub failing: usize,
    pub exempt: usize,
}

/// Run-level totals handed to the report writer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceSnapshot {
    pub run_id: String,
    pub vocabulary_version: String,
    pub vocabulary_sha256: String,
    pub generated_at: String,
    pub total_scanned: usize,
    pub compliant: usize,
    pub failing: usize,
    pub exempt: usize,
    pub explicit_field_count: usize,
    pub inherited_field_count: usize,
    pub drift_attempts: usize,
    pub violation_counts: BTreeMap<String, usize>,
    pub zones: BTreeMap<String, ZoneCounts>,
    /// Every failing artifact, sorted by path. Never truncated.
    pub failures: Vec<FailureRecord>,
}

impl ComplianceSnapshot {
    pub fn all_compliant(&self) -> bool {
        self.failing == 0
    }
}

/// Streaming fold over per-artifact results. Keeps counters and failures, not headers.
pub struct ComplianceAggregator {
    run_id: String,
    vocabulary_version: String,
    vocabulary_sha256: String,
    total_scanned: usize,
    compliant: usize,
    failing: usize,
    exempt: usize,
    explicit_field_count: usize,
    inherited_field_count: usize,
    drift_attempts: usize,
    violation_counts: BTreeMap<String, usize>,
    zones: BTreeMap<String, ZoneCounts>,
    failures: Vec<FailureRecord>,
}

impl ComplianceAggregator {
    pub fn new(run_id: &str, vocabulary: &Vocabulary) -> Self {
        Self {
            run_id: run_id.to_string(),
            vocabulary_version: vocabulary.version().to_string(),
            vocabulary_sha256: vocabulary.sha256().to_string(),
            total_scanned: 0,
            compliant: 0,
            failing: 0,
            exempt: 0,
            explicit_field_count: 0,
            inherited_field_count: 0,
            drift_attempts: 0,
            violation_counts: BTreeMap::new(),
            zones: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn push(&mut self, result: &ValidationResult) {
        self.total_scanned += 1;
        self.explicit_field_count += result.explicit_fields();
        self.inherited_field_count += result.inherited_fields();
        self.drift_attempts += result.count_of(ViolationKind::EnumDrift);
        for v in result.violations() {
            *self
                .violation_counts
                .entry(v.kind.as_str().to_string())
                .or_insert(0) += 1;
        }

        let zone = self.zones.entry(result.zone().to_string()).or_default();
        zone.scanned += 1;
        match result.status() {
            ArtifactStatus::PASS => {
                self.compliant += 1;
                zone.compliant += 1;
            }
            ArtifactStatus::EXEMPT => {
                self.exempt += 1;
                zone.exempt += 1;
            }
            ArtifactStatus::FAIL => {
                self.failing += 1;
                zone.failing += 1;
                self.failures.push(FailureRecord {
                    artifact: result.artifact().to_string(),
                    zone: result.zone().to_string(),
                    violations: result.violations().to_vec(),
                });
            }
        }
    }

    pub fn finish(mut self, generated_at: String) -> ComplianceSnapshot {
        self.failures.sort_by(|a, b| a.artifact.cmp(&b.artifact));
        ComplianceSnapshot {
            run_id: self.run_id,
            vocabulary_version: self.vocabulary_version,
            vocabulary_sha256: self.vocabulary_sha256,
            generated_at,
            total_scanned: self.total_scanned,
            compliant: self.compliant,
            failing: self.failing,
            exempt: self.exempt,
            explicit_field_count: self.explicit_field_count,
            inherited_field_count: self.inherited_field_count,
            drift_attempts: self.drift_attempts,
            violation_counts: self.violation_counts,
            zones: self.zones,
            failures: self.failures,
        }
    }
}

pub fn aggregate<'a>(
    run_id: &str,
    vocabulary: &Vocabulary,
    results: impl IntoIterator<Item = &'a ValidationResult>,
    generated_at: String,
) -> ComplianceSnapshot {
    let mut agg = ComplianceAggregator::new(run_id, vocabulary);
    for r in results {
        agg.push(r);
    }
    agg.finish(generated_at)
}
