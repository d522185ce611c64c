// PostgreSQL-backed store (schema in migrations/0001_init.sql)

use super::{SecretStore, UserStore};
use crate::core::errors::StoreError;
use crate::core::models::{CardData, CredentialData, NoteData, StoredRecord, User, UserId};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::error;

#[derive(FromRow)]
struct UserRow {
    id: i64,
    login: String,
    password_hash: String,
}

#[derive(FromRow)]
struct CardRow {
    id: i64,
    owner_id: i64,
    number: String,
    holder: String,
    expires: String,
    cvc: String,
    metadata: Vec<u8>,
}

#[derive(FromRow)]
struct NoteRow {
    id: i64,
    owner_id: i64,
    title: String,
    body: String,
    metadata: Vec<u8>,
}

#[derive(FromRow)]
struct CredentialRow {
    id: i64,
    owner_id: i64,
    resource: String,
    login: String,
    password: String,
    metadata: Vec<u8>,
}

fn owner(raw: i64) -> Result<UserId, StoreError> {
    UserId::new(raw).ok_or_else(|| {
        error!(owner_id = raw, "Row carries non-positive owner id");
        StoreError::Backend(format!("invalid owner id {}", raw))
    })
}

impl TryFrom<CardRow> for StoredRecord<CardData> {
    type Error = StoreError;

    fn try_from(r: CardRow) -> Result<Self, Self::Error> {
        Ok(StoredRecord {
            id: r.id,
            owner_id: owner(r.owner_id)?,
            data: CardData {
                number: r.number,
                holder: r.holder,
                expires: r.expires,
                cvc: r.cvc,
            },
            raw_metadata: r.metadata,
        })
    }
}

impl TryFrom<NoteRow> for StoredRecord<NoteData> {
    type Error = StoreError;

    fn try_from(r: NoteRow) -> Result<Self, Self::Error> {
        Ok(StoredRecord {
            id: r.id,
            owner_id: owner(r.owner_id)?,
            data: NoteData {
                title: r.title,
                text: r.body,
            },
            raw_metadata: r.metadata,
        })
    }
}

impl TryFrom<CredentialRow> for StoredRecord<CredentialData> {
    type Error = StoreError;

    fn try_from(r: CredentialRow) -> Result<Self, Self::Error> {
        Ok(StoredRecord {
            id: r.id,
            owner_id: owner(r.owner_id)?,
            data: CredentialData {
                resource: r.resource,
                login: r.login,
                password: r.password,
            },
            raw_metadata: r.metadata,
        })
    }
}

/// sqlx/Postgres implementation of both storage traits
pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    async fn delete_owned(&self, statement: &str, owner: UserId, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(statement)
            .bind(id)
            .bind(owner.get())
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }

    async fn card_add(
        &self,
        owner: UserId,
        card: &CardData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO cards (owner_id, number, holder, expires, cvc, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(owner.get())
        .bind(&card.number)
        .bind(&card.holder)
        .bind(&card.expires)
        .bind(&card.cvc)
        .bind(metadata)
        .fetch_one(&self.db_pool)
        .await?;
        Ok(id)
    }

    async fn card_list(&self, owner: UserId) -> Result<Vec<StoredRecord<CardData>>, StoreError> {
        sqlx::query_as::<_, CardRow>(
            "SELECT id, owner_id, number, holder, expires, cvc, metadata
             FROM cards
             WHERE owner_id = $1
             ORDER BY id",
        )
        .bind(owner.get())
        .fetch_all(&self.db_pool)
        .await?
        .into_iter()
        .map(StoredRecord::try_from)
        .collect()
    }

    async fn card_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError> {
        self.delete_owned("DELETE FROM cards WHERE id = $1 AND owner_id = $2", owner, id)
            .await
    }

    async fn note_add(
        &self,
        owner: UserId,
        note: &NoteData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO notes (owner_id, title, body, metadata)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(owner.get())
        .bind(&note.title)
        .bind(&note.text)
        .bind(metadata)
        .fetch_one(&self.db_pool)
        .await?;
        Ok(id)
    }

    async fn note_list(&self, owner: UserId) -> Result<Vec<StoredRecord<NoteData>>, StoreError> {
        sqlx::query_as::<_, NoteRow>(
            "SELECT id, owner_id, title, body, metadata
             FROM notes
             WHERE owner_id = $1
             ORDER BY id",
        )
        .bind(owner.get())
        .fetch_all(&self.db_pool)
        .await?
        .into_iter()
        .map(StoredRecord::try_from)
        .collect()
    }

    async fn note_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError> {
        self.delete_owned("DELETE FROM notes WHERE id = $1 AND owner_id = $2", owner, id)
            .await
    }

    async fn credential_add(
        &self,
        owner: UserId,
        credential: &CredentialData,
        metadata: Vec<u8>,
    ) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO credentials (owner_id, resource, login, password, metadata)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(owner.get())
        .bind(&credential.resource)
        .bind(&credential.login)
        .bind(&credential.password)
        .bind(metadata)
        .fetch_one(&self.db_pool)
        .await?;
        Ok(id)
    }

    async fn credential_list(
        &self,
        owner: UserId,
    ) -> Result<Vec<StoredRecord<CredentialData>>, StoreError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT id, owner_id, resource, login, password, metadata
             FROM credentials
             WHERE owner_id = $1
             ORDER BY id",
        )
        .bind(owner.get())
        .fetch_all(&self.db_pool)
        .await?
        .into_iter()
        .map(StoredRecord::try_from)
        .collect()
    }

    async fn credential_delete(&self, owner: UserId, id: i64) -> Result<(), StoreError> {
        self.delete_owned(
            "DELETE FROM credentials WHERE id = $1 AND owner_id = $2",
            owner,
            id,
        )
        .await
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (login, password_hash)
             VALUES ($1, $2)
             RETURNING id, login, password_hash",
        )
        .bind(login)
        .bind(password_hash)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(User {
            id: owner(row.id)?,
            login: row.login,
            password_hash: row.password_hash,
        })
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, login, password_hash FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.db_pool)
        .await?;

        row.map(|r| {
            Ok::<_, StoreError>(User {
                id: owner(r.id)?,
                login: r.login,
                password_hash: r.password_hash,
            })
        })
        .transpose()
    }
}
