// In-memory store for development and tests

use super::{SecretStore, UserStore};
use crate::core::errors::StoreError;
use crate::core::models::{CardData, CredentialData, NoteData, StoredRecord, User, UserId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// One record table; ids are never reused
struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, StoredRecord<T>>,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }

    fn insert(&mut self, owner: UserId, data: T, metadata: Vec<u8>) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(
            id,
            StoredRecord {
                id,
                owner_id: owner,
                data,
                raw_metadata: metadata,
            },
        );
        id
    }

    fn list(&self, owner: UserId) -> Vec<StoredRecord<T>> {
        self.rows
            .values()
            .filter(|row| row.owner_id == owner)
            .cloned()
            .collect()
    }

    fn delete(&mut self, owner: UserId, id: i64) -> Result<(), StoreError> {
        match self.rows.get(&id) {
            Some(row) if row.owner_id == owner => {
                self.rows.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

struct Users {
    next_id: i64,
    by_login: HashMap<String, User>,
}

/// `SecretStore` and `UserStore` held in process memory
pub struct MemoryStore {
    cards: RwLock<Table<CardData>>,
    notes: RwLock<Table<NoteData>>,
    credentials: RwLock<Table<CredentialData>>,
    users: RwLock<Users>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            cards: RwLock::new(Table::new()),
            notes: RwLock::new(Table::new()),
            credentials: RwLock::new(Table::new()),
            users: RwLock::new(Users {
                next_id: 1,
                by_login: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn card_add(
        &self,
        owner: UserId,
        card: &CardData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError> {
        Ok(self.cards.write().await.insert(owner, card.clone(), metadata))
    }

    async fn card_list(&self, owner: UserId) -> Result<Vec<StoredRecord<CardData>>, StoreError> {
        Ok(self.cards.read().await.list(owner))
    }

    async fn card_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError> {
        self.cards.write().await.delete(owner, id)
    }

    async fn note_add(
        &self,
        owner: UserId,
        note: &NoteData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError> {
        Ok(self.notes.write().await.insert(owner, note.clone(), metadata))
    }

    async fn note_list(&self, owner: UserId) -> Result<Vec<StoredRecord<NoteData>>, StoreError> {
        Ok(self.notes.read().await.list(owner))
    }

    async fn note_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError> {
        self.notes.write().await.delete(owner, id)
    }

    async fn credential_add(
        &self,
        owner: UserId,
        credential: &CredentialData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError> {
        Ok(self
            .credentials
            .write()
            .await
            .insert(owner, credential.clone(), metadata))
    }

    async fn credential_list(
        &self,
        owner: UserId,
    ) -> Result<Vec<StoredRecord<CredentialData>>, StoreError> {
        Ok(self.credentials.read().await.list(owner))
    }

    async fn credential_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError> {
        self.credentials.write().await.delete(owner, id)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.by_login.contains_key(login) {
            return Err(StoreError::AlreadyExists(format!("login '{}'", login)));
        }

        let id = UserId::new(users.next_id)
            .ok_or_else(|| StoreError::Backend("user id sequence exhausted".to_string()))?;
        users.next_id += 1;

        let user = User {
            id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
        };
        users.by_login.insert(login.to_string(), user.clone());
        Ok(user)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.by_login.get(login).cloned())
    }
}
