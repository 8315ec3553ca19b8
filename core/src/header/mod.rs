pub mod extract;
pub mod yaml_block;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Delimiter line that opens and closes every header region.
pub const HEADER_MARKER: &str = "---";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommentMarker {
    Hash,
    DoubleSlash,
}

impl CommentMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentMarker::Hash => "#",
            CommentMarker::DoubleSlash => "//",
        }
    }
}

/// Surrounding syntax the header is embedded in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FormatHint {
    /// `---` delimited block on the very first line of a document.
    Document,
    /// `---` delimited block at the start of the first docstring.
    Docstring,
    /// `---` delimited run of consecutive line comments.
    LineComment(CommentMarker),
    /// Whole file is structured YAML; only the first document counts.
    Structured,
}

impl FormatHint {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(FormatHint::Document),
            "py" => Some(FormatHint::Docstring),
            "sh" | "bash" | "zsh" | "ps1" | "rb" | "tf" => {
                Some(FormatHint::LineComment(CommentMarker::Hash))
            }
            "rs" | "js" | "ts" | "go" => Some(FormatHint::LineComment(CommentMarker::DoubleSlash)),
            "yaml" | "yml" => Some(FormatHint::Structured),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(FormatHint::from_extension)
    }
}

/// One governed artifact as handed over by the walker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactPath {
    pub path: PathBuf,
    /// Path relative to the governed root, `/` separated.
    pub rel_path: String,
    pub format: FormatHint,
    pub zone: String,
}

impl ArtifactPath {
    pub fn new(governed_root: &Path, path: impl Into<PathBuf>, format: FormatHint) -> Self {
        let path = path.into();
        let rel_path = path
            .strip_prefix(governed_root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let zone = rel_path
            .split('/')
            .next()
            .filter(|_| rel_path.contains('/'))
            .unwrap_or_default()
            .to_string();
        Self {
            path,
            rel_path,
            format,
            zone,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Header fields exactly as declared, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawHeader {
    fields: Vec<(String, Value)>,
}

impl RawHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys are unique; the YAML layer already rejects duplicates.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Found(RawHeader),
    NotFound,
    Malformed { diagnostic: String },
}

impl Extraction {
    pub fn malformed(diagnostic: impl Into<String>) -> Self {
        Extraction::Malformed {
            diagnostic: diagnostic.into(),
        }
    }
}
