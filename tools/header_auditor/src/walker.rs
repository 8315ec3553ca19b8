use metagov_core::config::AuditConfig;
use metagov_core::error::{CoreError, CoreResult};
use metagov_core::header::{ArtifactPath, FormatHint};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every governed artifact under the configured zones, sorted by path.
///
/// Sidecar headers are directory metadata, not artifacts, and are never yielded. Neither are the
/// run's own inputs and outputs: the config file, the vocabulary and the audit log. Hidden
/// directories are skipped.
pub fn governed_artifacts(cfg: &AuditConfig, config_path: &Path) -> CoreResult<Vec<ArtifactPath>> {
    let run_files: BTreeSet<PathBuf> = [
        Some(config_path),
        Some(cfg.vocabulary_path.as_path()),
        cfg.audit_log_path.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter_map(|p| fs::canonicalize(p).ok())
    .collect();

    let roots: Vec<_> = if cfg.zones.is_empty() {
        vec![cfg.governed_root.clone()]
    } else {
        cfg.zones.iter().map(|z| cfg.governed_root.join(z)).collect()
    };

    let mut out = Vec::new();
    for root in roots {
        if !root.is_dir() {
            return Err(CoreError::Config(format!(
                "zone directory not found: {}",
                root.display()
            )));
        }
        let walk = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
        for entry in walk {
            let entry = entry.map_err(|e| {
                CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()) == Some(cfg.sidecar_name.as_str()) {
                continue;
            }
            if fs::canonicalize(path)
                .map(|p| run_files.contains(&p))
                .unwrap_or(false)
            {
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !cfg.wants_extension(ext) {
                continue;
            }
            let Some(format) = FormatHint::from_path(path) else {
                tracing::debug!(path = %path.display(), "no header format for extension");
                continue;
            };
            out.push(ArtifactPath::new(&cfg.governed_root, path, format));
        }
    }
    out.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    out.dedup_by(|a, b| a.rel_path == b.rel_path);
    Ok(out)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
