//! Format decoders
//!
//! Both accepted serializations decode into the same [`FlatMap`]: dotted
//! paths with bracketed sequence indices (`kitty.threadpools.executors[0].coreSize`)
//! mapped to raw string values. Decoders are pure and never touch the
//! settings tree.

mod properties;
mod yaml;

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, KittyError};

pub use properties::decode_properties;
pub use yaml::decode_yaml;

/// Path-keyed string values produced by a decoder. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatMap(BTreeMap<String, String>);

impl FlatMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any earlier value for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for FlatMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl<'a> IntoIterator for &'a FlatMap {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The serialization a raw payload is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// Flat `key=value` lines.
    Properties,
    /// Nested block-structured documents.
    #[serde(alias = "yml")]
    Yaml,
}

impl ConfigFormat {
    pub fn decode(self, raw: &[u8]) -> Result<FlatMap, DecodeError> {
        match self {
            Self::Properties => decode_properties(raw),
            Self::Yaml => decode_yaml(raw),
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "properties" | "props" | "conf" => Some(Self::Properties),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl FromStr for ConfigFormat {
    type Err = KittyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "properties" | "props" => Ok(Self::Properties),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(KittyError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Properties => write!(f, "properties"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_map_last_insert_wins() {
        let mut map = FlatMap::new();
        assert!(map.insert("a", "1").is_none());
        assert_eq!(map.insert("a", "2"), Some("1".to_string()));
        assert_eq!(map.get("a"), Some("2"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_flat_map_from_iter() {
        let map: FlatMap = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("YAML".parse::<ConfigFormat>().unwrap(), ConfigFormat::Yaml);
        assert_eq!("yml".parse::<ConfigFormat>().unwrap(), ConfigFormat::Yaml);
        assert_eq!(
            "properties".parse::<ConfigFormat>().unwrap(),
            ConfigFormat::Properties
        );
        assert!(matches!(
            "json".parse::<ConfigFormat>(),
            Err(KittyError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("pools.yml")),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("conf/app.properties")),
            Some(ConfigFormat::Properties)
        );
        assert_eq!(ConfigFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_format_dispatches_to_decoder() {
        let map = ConfigFormat::Properties.decode(b"a=1").unwrap();
        assert_eq!(map.get("a"), Some("1"));

        let map = ConfigFormat::Yaml.decode(b"a: 1").unwrap();
        assert_eq!(map.get("a"), Some("1"));
    }
}
