// Metadata codec - storage encoding of validated metadata sets

use super::Metadata;
use crate::core::errors::CodecError;

/// Encodes metadata to the bytes kept in the record's metadata column
///
/// An empty set is stored as zero bytes, not as an encoded empty list; a
/// non-empty set is a JSON array of `{"key", "value"}` objects in input order.
pub struct MetadataCodec;

impl MetadataCodec {
    pub fn encode(metadata: &Metadata) -> Result<Vec<u8>, CodecError> {
        if metadata.is_empty() {
            return Ok(Vec::new());
        }

        serde_json::to_vec(metadata).map_err(|e| CodecError(e.to_string()))
    }

    pub fn decode(raw: &[u8]) -> Result<Metadata, CodecError> {
        if raw.is_empty() {
            return Ok(Metadata::default());
        }

        serde_json::from_slice(raw).map_err(|e| CodecError(e.to_string()))
    }
}
