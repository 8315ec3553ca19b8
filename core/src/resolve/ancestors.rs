use crate::error::{CoreError, CoreResult};
use crate::header::extract::extract_bytes;
use crate::header::{Extraction, FormatHint, RawHeader};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Raw-text loader. `Ok(None)` means the file does not exist.
pub trait TextSource: Send + Sync {
    fn read(&self, path: &Path) -> std::io::Result<Option<Vec<u8>>>;
}

pub struct FsTextSource;

impl TextSource for FsTextSource {
    fn read(&self, path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// In-memory source, keyed by exact path.
#[derive(Default)]
pub struct MemoryTextSource {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: &str) -> Self {
        self.files.insert(path.into(), text.as_bytes().to_vec());
        self
    }
}

impl TextSource for MemoryTextSource {
    fn read(&self, path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SidecarHeader {
    Absent,
    Declared { path: PathBuf, header: RawHeader },
    Malformed { path: PathBuf, diagnostic: String },
}

pub trait AncestorLookup: Send + Sync {
    fn sidecar_path(&self, dir: &Path) -> PathBuf;
    fn sidecar_for_dir(&self, dir: &Path) -> CoreResult<Arc<SidecarHeader>>;
}

type CacheSlot = Arc<OnceLock<Result<Arc<SidecarHeader>, String>>>;

/// Per-directory sidecar cache, populated at most once per directory for the lifetime of a run.
pub struct AncestorCache<S: TextSource = FsTextSource> {
    source: S,
    sidecar_name: String,
    sidecar_format: FormatHint,
    entries: Mutex<HashMap<PathBuf, CacheSlot>>,
    parses: AtomicUsize,
}

impl AncestorCache<FsTextSource> {
    pub fn on_disk(sidecar_name: &str) -> CoreResult<Self> {
        Self::new(FsTextSource, sidecar_name)
    }
}

impl<S: TextSource> AncestorCache<S> {
    pub fn new(source: S, sidecar_name: &str) -> CoreResult<Self> {
        let sidecar_format = FormatHint::from_path(Path::new(sidecar_name)).ok_or_else(|| {
            CoreError::Config(format!(
                "sidecar name `{}` has no recognised header format",
                sidecar_name
            ))
        })?;
        Ok(Self {
            source,
            sidecar_name: sidecar_name.to_string(),
            sidecar_format,
            entries: Mutex::new(HashMap::new()),
            parses: AtomicUsize::new(0),
        })
    }

    /// Number of sidecar files actually read and parsed so far.
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    fn load(&self, dir: &Path) -> Result<Arc<SidecarHeader>, String> {
        let path = self.sidecar_path(dir);
        let bytes = match self.source.read(&path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(Arc::new(SidecarHeader::Absent)),
            Err(e) => return Err(format!("cannot read sidecar {}: {}", path.display(), e)),
        };
        self.parses.fetch_add(1, Ordering::SeqCst);

        let sidecar = match extract_bytes(&bytes, self.sidecar_format) {
            Extraction::Found(header) => SidecarHeader::Declared { path, header },
            Extraction::NotFound => SidecarHeader::Absent,
            Extraction::Malformed { diagnostic } => {
                tracing::warn!(sidecar = %path.display(), %diagnostic, "malformed sidecar header");
                SidecarHeader::Malformed { path, diagnostic }
            }
        };
        Ok(Arc::new(sidecar))
    }
}

impl<S: TextSource> AncestorLookup for AncestorCache<S> {
    fn sidecar_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.sidecar_name)
    }

    fn sidecar_for_dir(&self, dir: &Path) -> CoreResult<Arc<SidecarHeader>> {
        let slot: CacheSlot = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| CoreError::AncestorCache("cache lock poisoned".to_string()))?;
            Arc::clone(entries.entry(dir.to_path_buf()).or_default())
        };
        // Racing callers block here until the winner's parse is stored, then share it.
        match slot.get_or_init(|| self.load(dir)) {
            Ok(sidecar) => Ok(Arc::clone(sidecar)),
            Err(msg) => Err(CoreError::AncestorCache(msg.clone())),
        }
    }
}
