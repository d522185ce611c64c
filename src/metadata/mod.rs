// Key/value metadata attached to secret records

pub mod codec;
pub mod validator;

pub use codec::MetadataCodec;
pub use validator::MetadataValidator;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on key and value length, in characters
pub const MAX_FIELD_CHARS: usize = 255;

/// One key/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered sequence of metadata entries
///
/// Input order is preserved so validation can name the first offending entry.
/// Equality for round-trip purposes is mapping equality, see [`Metadata::as_map`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Vec<MetadataEntry>);

impl Metadata {
    pub fn new(entries: Vec<MetadataEntry>) -> Self {
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataEntry> {
        self.0.iter()
    }

    /// Value of the first entry with `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    /// Key to value view, independent of entry order
    pub fn as_map(&self) -> BTreeMap<&str, &str> {
        self.0
            .iter()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| MetadataEntry::new(key, value))
                .collect(),
        )
    }
}
