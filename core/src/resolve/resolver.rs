use crate::error::CoreResult;
use crate::header::{ArtifactPath, RawHeader};
use crate::resolve::ancestors::{AncestorLookup, SidecarHeader};
use crate::resolve::{EffectiveField, EffectiveHeader, Provenance};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub effective: EffectiveHeader,
    /// Sidecars on the chain that could not be parsed, nearest first.
    pub malformed_ancestors: Vec<(PathBuf, String)>,
}

/// Directories whose sidecars apply to `artifact`, nearest first, ending at `governed_root`.
pub fn ancestor_dirs(
    artifact: &ArtifactPath,
    governed_root: &Path,
    lookup: &dyn AncestorLookup,
) -> Vec<PathBuf> {
    let Some(parent) = artifact.path.parent() else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = parent
        .ancestors()
        .take_while(|d| d.starts_with(governed_root))
        .map(Path::to_path_buf)
        .collect();
    // A sidecar never inherits from itself.
    if dirs
        .first()
        .map(|d| lookup.sidecar_path(d) == artifact.path)
        .unwrap_or(false)
    {
        dirs.remove(0);
    }
    dirs
}

/// Merge `local` with the ancestor chain, field by field. The nearest declaring ancestor wins
/// and a local declaration always wins, even when its value is empty.
pub fn resolve(
    artifact: &ArtifactPath,
    local: &RawHeader,
    governed_root: &Path,
    lookup: &dyn AncestorLookup,
) -> CoreResult<Resolution> {
    let mut effective = EffectiveHeader::default();
    for (name, value) in local.iter() {
        effective.push(EffectiveField {
            name: name.to_string(),
            value: value.clone(),
            provenance: Provenance::Explicit,
        });
    }

    let mut malformed_ancestors = Vec::new();
    for dir in ancestor_dirs(artifact, governed_root, lookup) {
        let sidecar = lookup.sidecar_for_dir(&dir)?;
        match sidecar.as_ref() {
            SidecarHeader::Absent => {}
            SidecarHeader::Malformed { path, diagnostic } => {
                malformed_ancestors.push((path.clone(), diagnostic.clone()));
            }
            SidecarHeader::Declared { path, header } => {
                for (name, value) in header.iter() {
                    if effective.contains(name) {
                        continue;
                    }
                    effective.push(EffectiveField {
                        name: name.to_string(),
                        value: value.clone(),
                        provenance: Provenance::Inherited {
                            source: path.clone(),
                        },
                    });
                }
            }
        }
    }

    Ok(Resolution {
        effective,
        malformed_ancestors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FormatHint;
    use crate::resolve::ancestors::{AncestorCache, MemoryTextSource};
    use serde_json::json;

    fn artifact(path: &str) -> ArtifactPath {
        ArtifactPath::new(Path::new("/repo"), path, FormatHint::Document)
    }

    #[test]
    fn chain_stops_at_governed_root() {
        let cache = AncestorCache::new(MemoryTextSource::new(), "_meta.yaml").unwrap();
        let dirs = ancestor_dirs(&artifact("/repo/policies/a/b/doc.md"), Path::new("/repo"), &cache);
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/repo/policies/a/b"),
                PathBuf::from("/repo/policies/a"),
                PathBuf::from("/repo/policies"),
                PathBuf::from("/repo"),
            ]
        );
    }

    #[test]
    fn sidecar_skips_its_own_directory() {
        let cache = AncestorCache::new(MemoryTextSource::new(), "_meta.yaml").unwrap();
        let a = ArtifactPath::new(Path::new("/repo"), "/repo/policies/_meta.yaml", FormatHint::Structured);
        let dirs = ancestor_dirs(&a, Path::new("/repo"), &cache);
        assert_eq!(dirs, vec![PathBuf::from("/repo")]);
    }

    #[test]
    fn per_field_resolution_mixes_ancestors() {
        let src = MemoryTextSource::new()
            .with_file("/repo/_meta.yaml", "owner: root-team\nreview: yearly\n")
            .with_file("/repo/policies/_meta.yaml", "owner: policy-team\n");
        let cache = AncestorCache::new(src, "_meta.yaml").unwrap();
        let mut local = RawHeader::new();
        local.insert("id", json!("POL-1"));

        let r = resolve(&artifact("/repo/policies/POL-1.md"), &local, Path::new("/repo"), &cache).unwrap();
        let e = &r.effective;
        assert_eq!(e.provenance("id"), Some(&Provenance::Explicit));
        assert_eq!(e.get("owner"), Some(&json!("policy-team")));
        assert_eq!(
            e.provenance("owner"),
            Some(&Provenance::Inherited {
                source: PathBuf::from("/repo/policies/_meta.yaml")
            })
        );
        assert_eq!(
            e.provenance("review"),
            Some(&Provenance::Inherited {
                source: PathBuf::from("/repo/_meta.yaml")
            })
        );
        assert_eq!(e.explicit_count(), 1);
        assert_eq!(e.inherited_count(), 2);
    }

    #[test]
    fn malformed_sidecar_is_reported_and_skipped() {
        let src = MemoryTextSource::new()
            .with_file("/repo/policies/_meta.yaml", "owner: [unclosed\n")
            .with_file("/repo/_meta.yaml", "owner: root-team\n");
        let cache = AncestorCache::new(src, "_meta.yaml").unwrap();
        let r = resolve(&artifact("/repo/policies/x.md"), &RawHeader::new(), Path::new("/repo"), &cache).unwrap();
        assert_eq!(r.malformed_ancestors.len(), 1);
        assert_eq!(r.effective.get("owner"), Some(&json!("root-team")));
    }
}
