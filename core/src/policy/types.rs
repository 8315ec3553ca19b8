use crate::validator::result::Severity;
use serde::{Deserialize, Serialize};

/// Whether enum drift blocks an artifact or is only counted.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DriftPolicy {
    #[default]
    INFORMATIONAL,
    FAILING,
}

impl DriftPolicy {
    pub fn drift_severity(&self) -> Severity {
        match self {
            DriftPolicy::INFORMATIONAL => Severity::ADVISORY,
            DriftPolicy::FAILING => Severity::BLOCKER,
        }
    }
}
