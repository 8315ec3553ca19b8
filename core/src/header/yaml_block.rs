use crate::header::{Extraction, RawHeader};
use serde::Deserialize;
use serde_yaml::Value as YamlValue;

/// Parse the text between two header markers.
pub fn parse_header_block(block: &str) -> Extraction {
    if block.trim().is_empty() {
        return Extraction::Found(RawHeader::new());
    }
    match serde_yaml::from_str::<YamlValue>(block) {
        Ok(value) => mapping_to_header(value),
        Err(e) => Extraction::malformed(format!("header is not valid YAML: {}", e)),
    }
}

/// Parse a whole structured artifact; documents after the first are never read.
pub fn parse_first_document(content: &str) -> Extraction {
    if content.trim().is_empty() {
        return Extraction::NotFound;
    }
    let first = match serde_yaml::Deserializer::from_str(content).next() {
        Some(doc) => doc,
        None => return Extraction::NotFound,
    };
    match YamlValue::deserialize(first) {
        Ok(YamlValue::Null) => Extraction::NotFound,
        Ok(value) => mapping_to_header(value),
        Err(e) => Extraction::malformed(format!("first document is not valid YAML: {}", e)),
    }
}

fn mapping_to_header(value: YamlValue) -> Extraction {
    let mapping = match value {
        YamlValue::Null => return Extraction::Found(RawHeader::new()),
        YamlValue::Mapping(m) => m,
        other => {
            return Extraction::malformed(format!(
                "header must be a mapping, found {}",
                yaml_kind(&other)
            ))
        }
    };

    let mut header = RawHeader::new();
    for (k, v) in mapping {
        let key = match k {
            YamlValue::String(s) => s,
            other => {
                return Extraction::malformed(format!(
                    "header keys must be strings, found {}",
                    yaml_kind(&other)
                ))
            }
        };
        match serde_json::to_value(&v) {
            Ok(json) => header.insert(key, json),
            Err(e) => {
                return Extraction::malformed(format!("field `{}` is not representable: {}", key, e))
            }
        }
    }
    Extraction::Found(header)
}

fn yaml_kind(v: &YamlValue) -> &'static str {
    match v {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "bool",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "sequence",
        YamlValue::Mapping(_) => "mapping",
        YamlValue::Tagged(_) => "tagged value",
    }
}
