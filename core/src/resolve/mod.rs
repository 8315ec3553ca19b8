pub mod ancestors;
pub mod resolver;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Explicit,
    Inherited { source: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveField {
    pub name: String,
    pub value: Value,
    pub provenance: Provenance,
}

/// Local declarations merged with ancestor defaults. Every field carries exactly one provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EffectiveHeader {
    fields: Vec<EffectiveField>,
}

impl EffectiveHeader {
    pub(crate) fn push(&mut self, field: EffectiveField) {
        debug_assert!(!self.contains(&field.name));
        self.fields.push(field);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|f| &f.value)
    }

    pub fn field(&self, name: &str) -> Option<&EffectiveField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn provenance(&self, name: &str) -> Option<&Provenance> {
        self.field(name).map(|f| &f.provenance)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn fields(&self) -> &[EffectiveField] {
        &self.fields
    }

    pub fn explicit_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.provenance == Provenance::Explicit)
            .count()
    }

    pub fn inherited_count(&self) -> usize {
        self.fields.len() - self.explicit_count()
    }
}
