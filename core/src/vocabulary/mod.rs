use crate::determinism::sha256_hex;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(SourceFormat::Json),
            Some("yaml") | Some("yml") => Ok(SourceFormat::Yaml),
            _ => Err(CoreError::VocabularyLoad(format!(
                "unsupported vocabulary file type: {}",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct VocabularyDocument {
    vocabulary_version: String,
    required_fields: Vec<String>,
    #[serde(default)]
    enums: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    identity_field: Option<String>,
}

/// Canonical enumerations plus the globally required fields. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    version: String,
    required: BTreeSet<String>,
    enums: BTreeMap<String, Vec<String>>,
    identity_field: Option<String>,
    sha256: String,
}

impl Vocabulary {
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::VocabularyLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&text, format)
    }

    pub fn parse(text: &str, format: SourceFormat) -> CoreResult<Self> {
        let doc: VocabularyDocument = match format {
            SourceFormat::Json => serde_json::from_str(text)
                .map_err(|e| CoreError::VocabularyLoad(format!("invalid vocabulary JSON: {}", e)))?,
            SourceFormat::Yaml => serde_yaml::from_str(text)
                .map_err(|e| CoreError::VocabularyLoad(format!("invalid vocabulary YAML: {}", e)))?,
        };
        Self::from_document(doc, sha256_hex(text.as_bytes()))
    }

    fn from_document(doc: VocabularyDocument, sha256: String) -> CoreResult<Self> {
        if doc.vocabulary_version.trim().is_empty() {
            return Err(CoreError::VocabularyLoad(
                "vocabulary_version must not be empty".to_string(),
            ));
        }

        let mut required = BTreeSet::new();
        for f in doc.required_fields {
            if f.trim().is_empty() {
                return Err(CoreError::VocabularyLoad(
                    "required_fields contains an empty name".to_string(),
                ));
            }
            if !required.insert(f.clone()) {
                return Err(CoreError::VocabularyLoad(format!(
                    "required field `{}` listed twice",
                    f
                )));
            }
        }

        for (name, values) in &doc.enums {
            if values.is_empty() {
                return Err(CoreError::VocabularyLoad(format!(
                    "enumeration `{}` has no values",
                    name
                )));
            }
            let mut seen = BTreeSet::new();
            for v in values {
                if v.trim().is_empty() {
                    return Err(CoreError::VocabularyLoad(format!(
                        "enumeration `{}` contains an empty value",
                        name
                    )));
                }
                if !seen.insert(v.as_str()) {
                    return Err(CoreError::VocabularyLoad(format!(
                        "enumeration `{}` lists `{}` twice",
                        name, v
                    )));
                }
            }
        }

        if let Some(id) = &doc.identity_field {
            if doc.enums.contains_key(id) {
                return Err(CoreError::VocabularyLoad(format!(
                    "identity field `{}` cannot also be an enumeration",
                    id
                )));
            }
        }

        Ok(Self {
            version: doc.vocabulary_version,
            required,
            enums: doc.enums,
            identity_field: doc.identity_field,
            sha256,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// SHA-256 of the source text the vocabulary was loaded from.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn required_fields(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn identity_field(&self) -> Option<&str> {
        self.identity_field.as_deref()
    }

    pub fn enumeration(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(|v| v.as_slice())
    }

    pub fn is_member(&self, enum_name: &str, value: &str) -> bool {
        self.enums
            .get(enum_name)
            .map(|values| values.iter().any(|v| v == value))
            .unwrap_or(false)
    }
}
