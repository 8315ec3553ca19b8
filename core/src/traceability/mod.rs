use crate::config::{RecordSetConfig, TraceabilityConfig};
use crate::error::{CoreError, CoreResult};
use crate::header::ArtifactPath;
use crate::validator::result::{HeaderState, ValidationResult, Violation, ViolationKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub path: PathBuf,
    pub text: String,
}

/// A named body of governance records searched by plain substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    name: String,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(name: impl Into<String>, mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn load(cfg: &RecordSetConfig) -> CoreResult<Self> {
        if !cfg.path.is_dir() {
            return Err(CoreError::Config(format!(
                "record set `{}` directory {} does not exist",
                cfg.name,
                cfg.path.display()
            )));
        }
        let mut records = Vec::new();
        for e in WalkDir::new(&cfg.path) {
            let e = e.map_err(|err| {
                CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
            })?;
            let p = e.path();
            if !p.is_file() || !has_extension(p, &cfg.extensions) {
                continue;
            }
            let bytes = std::fs::read(p)?;
            records.push(Record {
                path: p.to_path_buf(),
                text: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(Self::new(cfg.name.clone(), records))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any record other than `exclude` contains `needle` verbatim.
    pub fn mentions(&self, needle: &str, exclude: &Path) -> bool {
        self.records
            .iter()
            .any(|r| r.path != exclude && r.text.contains(needle))
    }
}

fn has_extension(p: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    p.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Full-text existence check: incidental substring matches count as references.
pub struct TraceabilityAuditor {
    rule: TraceabilityConfig,
    record_sets: Vec<RecordSet>,
}

impl TraceabilityAuditor {
    pub fn new(rule: TraceabilityConfig, record_sets: Vec<RecordSet>) -> Self {
        Self { rule, record_sets }
    }

    pub fn load(rule: &TraceabilityConfig) -> CoreResult<Self> {
        let mut sets = Vec::with_capacity(rule.record_sets.len());
        for cfg in &rule.record_sets {
            sets.push(RecordSet::load(cfg)?);
        }
        Ok(Self::new(rule.clone(), sets))
    }

    pub fn record_sets(&self) -> &[RecordSet] {
        &self.record_sets
    }

    pub fn applies_to(&self, artifact: &ArtifactPath) -> bool {
        let name = artifact.file_name();
        if self.rule.exempt_names.iter().any(|n| *n == name) {
            return false;
        }
        if !self.rule.traceable_zones.is_empty()
            && !self.rule.traceable_zones.iter().any(|z| *z == artifact.zone)
        {
            return false;
        }
        has_extension(&artifact.path, &self.rule.traceable_extensions)
            && !self.rule.traceable_extensions.is_empty()
    }

    pub fn audit(&self, artifact: &ArtifactPath) -> ValidationResult {
        let name = artifact.file_name();
        let missing: Vec<&str> = self
            .record_sets
            .iter()
            .filter(|set| !set.mentions(&name, &artifact.path))
            .map(|set| set.name())
            .collect();

        let violations = if missing.is_empty() {
            Vec::new()
        } else {
            vec![Violation::blocker(
                ViolationKind::MissingTrace,
                None,
                format!(
                    "`{}` is not referenced by any record in: {}",
                    name,
                    missing.join(", ")
                ),
            )]
        };
        ValidationResult::new(artifact, HeaderState::Skipped, 0, 0, violations)
    }
}
