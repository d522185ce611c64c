// Metadata validation - structural rules checked before anything is encoded or stored

use super::{Metadata, MAX_FIELD_CHARS};
use crate::core::errors::MetadataError;
use std::collections::HashSet;

/// Validates metadata sets against the shared structural rules
pub struct MetadataValidator;

impl MetadataValidator {
    /// Validate a metadata set, stopping at the first violation
    ///
    /// Entries are scanned in input order. An empty set is always valid.
    pub fn validate(metadata: &Metadata) -> Result<(), MetadataError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(metadata.len());

        for (index, entry) in metadata.iter().enumerate() {
            Self::validate_key(&entry.key, index)?;
            Self::validate_value(&entry.key, &entry.value)?;

            if !seen.insert(entry.key.as_str()) {
                return Err(MetadataError::DuplicateKey {
                    key: entry.key.clone(),
                });
            }
        }

        Ok(())
    }

    fn validate_key(key: &str, index: usize) -> Result<(), MetadataError> {
        if key.is_empty() {
            return Err(MetadataError::EmptyKey { index });
        }

        if key.chars().count() > MAX_FIELD_CHARS {
            return Err(MetadataError::KeyTooLong {
                key: key.chars().take(32).collect(),
                max: MAX_FIELD_CHARS,
            });
        }

        if key.chars().any(char::is_whitespace) {
            return Err(MetadataError::KeyContainsWhitespace {
                key: key.to_string(),
            });
        }

        Ok(())
    }

    fn validate_value(key: &str, value: &str) -> Result<(), MetadataError> {
        if value.is_empty() {
            return Err(MetadataError::EmptyValue {
                key: key.to_string(),
            });
        }

        if value.chars().count() > MAX_FIELD_CHARS {
            return Err(MetadataError::ValueTooLong {
                key: key.to_string(),
                max: MAX_FIELD_CHARS,
            });
        }

        Ok(())
    }
}
