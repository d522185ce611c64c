// Storage boundary for users and secret records

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::core::errors::StoreError;
use crate::core::models::{CardData, CredentialData, NoteData, StoredRecord, User, UserId};
use async_trait::async_trait;

/// Secret record persistence
///
/// Metadata arrives already encoded and is never interpreted here. Deletes
/// are owner-scoped: someone else's record looks exactly like a missing one.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Liveness check for the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;

    async fn card_add(
        &self,
        owner: UserId,
        card: &CardData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError>;
    async fn card_list(&self, owner: UserId) -> Result<Vec<StoredRecord<CardData>>, StoreError>;
    /// `NotFound` unless `owner` has a card with this id
    async fn card_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError>;

    async fn note_add(
        &self,
        owner: UserId,
        note: &NoteData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError>;
    async fn note_list(&self, owner: UserId) -> Result<Vec<StoredRecord<NoteData>>, StoreError>;
    async fn note_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError>;

    async fn credential_add(
        &self,
        owner: UserId,
        credential: &CredentialData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError>;
    async fn credential_list(
        &self,
        owner: UserId,
    ) -> Result<Vec<StoredRecord<CredentialData>>, StoreError>;
    async fn credential_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError>;
}

/// Account persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// `AlreadyExists` when the login is taken
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, StoreError>;
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;
}
