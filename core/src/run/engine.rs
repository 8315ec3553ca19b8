use crate::audit::log::AuditLog;
use crate::compliance::{ComplianceAggregator, ComplianceSnapshot};
use crate::config::AuditConfig;
use crate::determinism::{now_rfc3339_utc, run_id_for};
use crate::error::CoreResult;
use crate::header::extract::extract_bytes;
use crate::header::{ArtifactPath, Extraction, RawHeader};
use crate::policy::types::DriftPolicy;
use crate::resolve::ancestors::{AncestorCache, AncestorLookup};
use crate::resolve::resolver::resolve;
use crate::run::lifecycle;
use crate::run::pool::process_bounded;
use crate::traceability::TraceabilityAuditor;
use crate::validator::result::{HeaderState, ValidationResult, Violation, ViolationKind};
use crate::validator::validate;
use crate::vocabulary::Vocabulary;
use regex::RegexSet;
use std::path::PathBuf;

/// One governed artifact as handed over by the walker. `content` holds the read error when the
/// file could not be loaded; such an artifact fails on its own without stopping the run.
#[derive(Debug, Clone)]
pub struct ArtifactInput {
    pub artifact: ArtifactPath,
    pub content: Result<Vec<u8>, String>,
}

impl ArtifactInput {
    pub fn new(artifact: ArtifactPath, bytes: Vec<u8>) -> Self {
        Self {
            artifact,
            content: Ok(bytes),
        }
    }

    /// Load the artifact's bytes from disk, keeping any I/O failure as the content.
    pub fn read(artifact: ArtifactPath) -> Self {
        let content = std::fs::read(&artifact.path).map_err(|e| e.to_string());
        Self { artifact, content }
    }
}

/// Snapshot plus every per-artifact result, sorted by artifact path.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshot: ComplianceSnapshot,
    pub results: Vec<ValidationResult>,
}

/// Read-only state shared by every worker of a run.
pub struct AuditEngine<L: AncestorLookup = AncestorCache> {
    run_id: String,
    governed_root: PathBuf,
    drift_policy: DriftPolicy,
    workers: usize,
    queue_bound: usize,
    exemptions: RegexSet,
    vocabulary: Vocabulary,
    lookup: L,
    traceability: TraceabilityAuditor,
}

impl AuditEngine<AncestorCache> {
    /// Load the vocabulary and record sets named by `cfg` and build an on-disk ancestor cache.
    /// Any failure here is fatal to the run.
    pub fn from_config(cfg: &AuditConfig) -> CoreResult<Self> {
        let vocabulary = Vocabulary::load(&cfg.vocabulary_path)?;
        let traceability = TraceabilityAuditor::load(&cfg.traceability)?;
        let lookup = AncestorCache::on_disk(&cfg.sidecar_name)?;
        Self::new(cfg, vocabulary, lookup, traceability)
    }
}

impl<L: AncestorLookup> AuditEngine<L> {
    pub fn new(
        cfg: &AuditConfig,
        vocabulary: Vocabulary,
        lookup: L,
        traceability: TraceabilityAuditor,
    ) -> CoreResult<Self> {
        cfg.validate()?;
        let run_id = run_id_for(&serde_json::json!({
            "vocabulary_sha256": vocabulary.sha256(),
            "config": cfg,
        }))?;
        Ok(Self {
            run_id,
            governed_root: cfg.governed_root.clone(),
            drift_policy: cfg.drift_policy,
            workers: cfg.workers,
            queue_bound: cfg.queue_bound,
            exemptions: cfg.exemptions()?,
            vocabulary,
            lookup,
            traceability,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn traceability(&self) -> &TraceabilityAuditor {
        &self.traceability
    }

    /// Extract, resolve and validate a single artifact. Only cache failures are errors;
    /// everything wrong with the artifact itself lands in the result.
    pub fn process_artifact(&self, input: &ArtifactInput) -> CoreResult<ValidationResult> {
        let artifact = &input.artifact;
        if self.exemptions.is_match(&artifact.rel_path) {
            tracing::debug!(artifact = %artifact.rel_path, "artifact exempt");
            return Ok(ValidationResult::exempt(artifact));
        }

        let bytes = match &input.content {
            Ok(bytes) => bytes,
            Err(reason) => {
                tracing::warn!(artifact = %artifact.rel_path, %reason, "artifact unreadable");
                return Ok(ValidationResult::new(
                    artifact,
                    HeaderState::Malformed,
                    0,
                    0,
                    vec![Violation::blocker(
                        ViolationKind::MalformedHeader,
                        None,
                        format!("cannot read artifact: {}", reason),
                    )],
                ));
            }
        };

        let (local, state) = match extract_bytes(bytes, artifact.format) {
            Extraction::Found(header) => (header, HeaderState::Found),
            Extraction::NotFound => (RawHeader::new(), HeaderState::NotFound),
            Extraction::Malformed { diagnostic } => {
                tracing::debug!(artifact = %artifact.rel_path, %diagnostic, "malformed header");
                return Ok(ValidationResult::malformed(artifact, &diagnostic));
            }
        };

        let resolution = resolve(artifact, &local, &self.governed_root, &self.lookup)?;
        let mut result = validate(
            artifact,
            state,
            &resolution.effective,
            &self.vocabulary,
            self.drift_policy,
        );

        if !resolution.malformed_ancestors.is_empty() {
            let violations = resolution
                .malformed_ancestors
                .iter()
                .map(|(path, diagnostic)| {
                    Violation::blocker(
                        ViolationKind::MalformedHeader,
                        None,
                        format!(
                            "ancestor header {} is malformed: {}",
                            path.display(),
                            diagnostic
                        ),
                    )
                })
                .collect();
            result = result.merge(ValidationResult::new(
                artifact,
                HeaderState::Skipped,
                0,
                0,
                violations,
            ));
        }

        if self.traceability.applies_to(artifact) {
            result = result.merge(self.traceability.audit(artifact));
        }

        tracing::debug!(
            artifact = %result.artifact(),
            status = ?result.status(),
            violations = result.violations().len(),
            "artifact audited"
        );
        Ok(result)
    }

    /// Run every input through the worker pool. `sink` sees each result once, in completion
    /// order, on a single thread. When `audit` is given the run's lifecycle is recorded there.
    pub fn run<I, F>(
        &self,
        inputs: I,
        mut audit: Option<&mut AuditLog>,
        mut sink: F,
    ) -> CoreResult<ComplianceSnapshot>
    where
        I: IntoIterator<Item = ArtifactInput>,
        F: FnMut(ValidationResult) + Send,
    {
        let started_at = now_rfc3339_utc()?;
        tracing::info!(
            run_id = %self.run_id,
            vocabulary_version = %self.vocabulary.version(),
            workers = self.workers,
            "audit run started"
        );
        if let Some(log) = audit.as_deref_mut() {
            let root = self.governed_root.display().to_string();
            lifecycle::emit_run_started(log, &self.run_id, &root, &started_at)?;
            lifecycle::emit_vocabulary_loaded(log, &self.run_id, &self.vocabulary, &started_at)?;
            lifecycle::emit_record_sets_loaded(log, &self.run_id, &self.traceability, &started_at)?;
        }

        let run_id = self.run_id.as_str();
        let mut agg = ComplianceAggregator::new(run_id, &self.vocabulary);
        let outcome = process_bounded(
            inputs,
            self.workers,
            self.queue_bound,
            |input: ArtifactInput| self.process_artifact(&input),
            |result: ValidationResult| {
                if result.count_of(ViolationKind::EnumDrift) > 0 {
                    tracing::warn!(artifact = %result.artifact(), "enum drift detected");
                }
                if let Some(log) = audit.as_deref_mut() {
                    lifecycle::emit_artifact_outcome(log, run_id, &result, &now_rfc3339_utc()?)?;
                }
                agg.push(&result);
                sink(result);
                Ok(())
            },
        );

        if let Err(e) = outcome {
            tracing::error!(run_id = %self.run_id, error = %e, "audit run failed");
            if let Some(log) = audit.as_deref_mut() {
                let ts = now_rfc3339_utc().unwrap_or(started_at);
                if let Err(log_err) =
                    lifecycle::emit_run_failed(log, &self.run_id, &e.to_string(), &ts)
                {
                    tracing::warn!(error = %log_err, "could not record RUN_FAILED");
                }
            }
            return Err(e);
        }

        let snapshot = agg.finish(now_rfc3339_utc()?);
        if let Some(log) = audit.as_deref_mut() {
            lifecycle::emit_run_completed(log, &snapshot)?;
        }
        tracing::info!(
            run_id = %snapshot.run_id,
            total_scanned = snapshot.total_scanned,
            compliant = snapshot.compliant,
            failing = snapshot.failing,
            exempt = snapshot.exempt,
            "audit run completed"
        );
        Ok(snapshot)
    }

    /// Like [`AuditEngine::run`] but keeps every result.
    pub fn run_collect<I>(&self, inputs: I, audit: Option<&mut AuditLog>) -> CoreResult<RunReport>
    where
        I: IntoIterator<Item = ArtifactInput>,
    {
        let mut results = Vec::new();
        let snapshot = self.run(inputs, audit, |r| results.push(r))?;
        results.sort_by(|a, b| a.artifact().cmp(b.artifact()));
        Ok(RunReport { snapshot, results })
    }
}
