use crate::error::{CoreError, CoreResult};
use crate::header::FormatHint;
use crate::policy::types::DriftPolicy;
use crate::vocabulary::SourceFormat;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_SIDECAR_NAME: &str = "_meta.yaml";

fn default_extensions() -> Vec<String> {
    ["md", "py", "sh", "yaml", "yml"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_sidecar_name() -> String {
    DEFAULT_SIDECAR_NAME.to_string()
}

fn default_workers() -> usize {
    4
}

fn default_queue_bound() -> usize {
    64
}

fn default_record_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RecordSetConfig {
    pub name: String,
    /// Relative paths resolve against the governed root.
    pub path: PathBuf,
    #[serde(default = "default_record_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TraceabilityConfig {
    #[serde(default)]
    pub traceable_extensions: Vec<String>,
    /// Empty means every zone.
    #[serde(default)]
    pub traceable_zones: Vec<String>,
    #[serde(default)]
    pub exempt_names: Vec<String>,
    #[serde(default)]
    pub record_sets: Vec<RecordSetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    pub governed_root: PathBuf,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    pub vocabulary_path: PathBuf,
    #[serde(default = "default_sidecar_name")]
    pub sidecar_name: String,
    #[serde(default)]
    pub drift_policy: DriftPolicy,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_bound")]
    pub queue_bound: usize,
    #[serde(default)]
    pub exempt_patterns: Vec<String>,
    #[serde(default)]
    pub traceability: TraceabilityConfig,
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
}

impl AuditConfig {
    /// Minimal config for a root and vocabulary; everything else defaulted.
    pub fn new(governed_root: impl Into<PathBuf>, vocabulary_path: impl Into<PathBuf>) -> Self {
        Self {
            governed_root: governed_root.into(),
            zones: Vec::new(),
            extensions: default_extensions(),
            vocabulary_path: vocabulary_path.into(),
            sidecar_name: default_sidecar_name(),
            drift_policy: DriftPolicy::default(),
            workers: default_workers(),
            queue_bound: default_queue_bound(),
            exempt_patterns: Vec::new(),
            traceability: TraceabilityConfig::default(),
            audit_log_path: None,
        }
    }

    /// Load from JSON or YAML; relative paths resolve against the config file's directory.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let format = SourceFormat::from_path(path)
            .map_err(|_| CoreError::Config(format!("unsupported config type: {}", path.display())))?;
        let cfg = Self::parse(&text, format)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let cfg = cfg.anchored_at(base);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn parse(text: &str, format: SourceFormat) -> CoreResult<Self> {
        let cfg: Self = match format {
            SourceFormat::Json => serde_json::from_str(text)
                .map_err(|e| CoreError::Config(format!("invalid config JSON: {}", e)))?,
            SourceFormat::Yaml => serde_yaml::from_str(text)
                .map_err(|e| CoreError::Config(format!("invalid config YAML: {}", e)))?,
        };
        Ok(cfg)
    }

    /// Make every relative path absolute: root-level paths against `base`, record sets against the governed root.
    pub fn anchored_at(mut self, base: &Path) -> Self {
        self.governed_root = anchor(base, &self.governed_root);
        self.vocabulary_path = anchor(base, &self.vocabulary_path);
        self.audit_log_path = self.audit_log_path.map(|p| anchor(base, &p));
        for rs in &mut self.traceability.record_sets {
            rs.path = anchor(&self.governed_root, &rs.path);
        }
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.workers == 0 {
            return Err(CoreError::Config("workers must be at least 1".to_string()));
        }
        if self.queue_bound == 0 {
            return Err(CoreError::Config("queue_bound must be at least 1".to_string()));
        }
        if FormatHint::from_path(Path::new(&self.sidecar_name)).is_none() {
            return Err(CoreError::Config(format!(
                "sidecar_name `{}` has no recognised header format",
                self.sidecar_name
            )));
        }
        self.exemptions()?;

        let mut names = BTreeSet::new();
        for rs in &self.traceability.record_sets {
            if rs.name.trim().is_empty() {
                return Err(CoreError::Config("record set name must not be empty".to_string()));
            }
            if !names.insert(rs.name.as_str()) {
                return Err(CoreError::Config(format!(
                    "record set `{}` declared twice",
                    rs.name
                )));
            }
        }
        Ok(())
    }

    pub fn exemptions(&self) -> CoreResult<RegexSet> {
        RegexSet::new(&self.exempt_patterns)
            .map_err(|e| CoreError::Config(format!("invalid exempt pattern: {}", e)))
    }

    pub fn wants_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

fn anchor(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
