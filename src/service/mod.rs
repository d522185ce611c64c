// Ownership-enforcing record services

pub mod cards;
pub mod credentials;
pub mod notes;
pub mod users;

pub use cards::CardService;
pub use credentials::CredentialService;
pub use notes::NoteService;
pub use users::UserService;

use crate::auth::interceptor::AuthenticatedContext;
use crate::core::errors::KeeperError;
use crate::core::models::{Record, StoredRecord};
use crate::metadata::{Metadata, MetadataCodec, MetadataValidator};
use tracing::error;

/// Validate then encode metadata for storage
pub(crate) fn encode_metadata(metadata: &Metadata) -> Result<Vec<u8>, KeeperError> {
    MetadataValidator::validate(metadata)?;
    Ok(MetadataCodec::encode(metadata)?)
}

/// Decode the metadata of every stored row
///
/// A row that fails to decode fails the whole listing.
pub(crate) fn decode_records<T>(
    ctx: &AuthenticatedContext,
    rows: Vec<StoredRecord<T>>,
) -> Result<Vec<Record<T>>, KeeperError> {
    rows.into_iter()
        .map(|row| {
            let metadata = MetadataCodec::decode(&row.raw_metadata).map_err(|e| {
                error!(
                    record_id = row.id,
                    user_id = %ctx.principal().user_id,
                    operation = ctx.operation().name(),
                    error = %e,
                    "Stored metadata failed to decode"
                );
                KeeperError::from(e)
            })?;
            Ok(Record {
                id: row.id,
                owner_id: row.owner_id,
                data: row.data,
                metadata,
            })
        })
        .collect()
}

/// Reject empty (or whitespace-only) required text fields
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), KeeperError> {
    if value.trim().is_empty() {
        return Err(KeeperError::Validation(format!("{} is empty", field)));
    }
    Ok(())
}
