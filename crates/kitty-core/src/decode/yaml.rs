//! Nested YAML decoder
//!
//! Nested mappings become dotted paths and sequences become bracket
//! indexed paths, so both serializations feed the binder identically.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::FlatMap;
use crate::error::DecodeError;

/// Decode one or more YAML documents into a flat mapping.
///
/// Documents separated by `---` are merged in order; a later document
/// overrides keys set by an earlier one. Empty documents are skipped.
pub fn decode_yaml(raw: &[u8]) -> Result<FlatMap, DecodeError> {
    let mut map = FlatMap::new();

    for document in serde_yaml::Deserializer::from_slice(raw) {
        let value = Value::deserialize(document).map_err(|e| DecodeError::Syntax(e.to_string()))?;
        let value = match value {
            Value::Tagged(tagged) => tagged.value,
            other => other,
        };
        match value {
            Value::Null => continue,
            Value::Mapping(mapping) => flatten_mapping("", &mapping, &mut map),
            other => {
                return Err(DecodeError::InvalidStructure {
                    found: kind_of(&other).to_string(),
                })
            }
        }
    }

    if map.is_empty() {
        return Err(DecodeError::EmptyDocument);
    }
    Ok(map)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn flatten_mapping(prefix: &str, mapping: &Mapping, out: &mut FlatMap) {
    for (key, value) in mapping {
        match scalar_string(key) {
            Some(key) => flatten(&join(prefix, &key), value, out),
            None => debug!(prefix, "Skipping non-scalar YAML key"),
        }
    }
}

fn flatten(path: &str, value: &Value, out: &mut FlatMap) {
    match value {
        Value::Mapping(mapping) => flatten_mapping(path, mapping, out),
        Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(&format!("{path}[{index}]"), item, out);
            }
        }
        Value::Tagged(tagged) => flatten(path, &tagged.value, out),
        scalar => {
            if let Some(text) = scalar_string(scalar) {
                out.insert(path, text);
            }
        }
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
