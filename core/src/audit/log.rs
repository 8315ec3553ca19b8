use crate::audit::event::{compute_event_hash, finalize_event, AuditEvent, ZERO_HASH_64};
use crate::error::{CoreError, CoreResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only NDJSON log; each event chains to the previous one's hash.
pub struct AuditLog {
    path: PathBuf,
    last_hash: String,
}

/// `line` is the 1-based line in the file, blank lines included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    Intact { events: usize },
    Broken { line: usize, reason: String },
}

impl AuditLog {
    pub fn open_or_create(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            File::create(&path)?;
            return Ok(Self {
                path,
                last_hash: ZERO_HASH_64.to_string(),
            });
        }

        let mut last_hash = ZERO_HASH_64.to_string();
        for (_, event) in read_events(&path)? {
            last_hash = event.event_hash;
        }
        Ok(Self { path, last_hash })
    }

    pub fn append(&mut self, mut event: AuditEvent) -> CoreResult<AuditEvent> {
        event.prev_event_hash = self.last_hash.clone();
        let event = finalize_event(event)?;
        let line = serde_json::to_string(&event)?;
        let mut f = OpenOptions::new().append(true).open(&self.path)?;
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
        self.last_hash = event.event_hash.clone();
        Ok(event)
    }
}

// Events paired with their 1-based line number in the file.
fn read_events(path: &Path) -> CoreResult<Vec<(usize, AuditEvent)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: AuditEvent = serde_json::from_str(&line).map_err(|e| {
            CoreError::InvalidInput(format!("audit log line {} unreadable: {}", idx + 1, e))
        })?;
        out.push((idx + 1, event));
    }
    Ok(out)
}

/// Re-hash every event and check each links to its predecessor.
pub fn verify_chain(path: impl AsRef<Path>) -> CoreResult<ChainStatus> {
    let events = read_events(path.as_ref())?;
    let mut prev = ZERO_HASH_64.to_string();
    for (line, event) in &events {
        let line = *line;
        if event.prev_event_hash != prev {
            return Ok(ChainStatus::Broken {
                line,
                reason: "prev_event_hash does not match previous event".to_string(),
            });
        }
        if compute_event_hash(event)? != event.event_hash {
            return Ok(ChainStatus::Broken {
                line,
                reason: "event_hash does not match event contents".to_string(),
            });
        }
        prev = event.event_hash.clone();
    }
    Ok(ChainStatus::Intact {
        events: events.len(),
    })
}
