// Domain models for the keeper service

use crate::auth::fingerprint::TokenFingerprint;
use crate::core::errors::KeeperError;
use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positive numeric user identifier
///
/// Construction rejects zero and negative ids, so a `UserId` in hand is
/// always a usable owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = String;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        UserId::new(id).ok_or_else(|| format!("user id must be positive, got {}", id))
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verified identity attached to one in-flight call
///
/// Built only by `TokenVerifier`; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub login: String,
    pub issued_via: TokenFingerprint,
    pub expires_at: DateTime<Utc>,
}

/// Registered account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub password_hash: String,
}

/// Payment card fields
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    pub number: String,
    pub holder: String,
    /// `MM/YY`
    pub expires: String,
    pub cvc: String,
}

impl fmt::Debug for CardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits: String = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        let last4 = &digits[digits.len().saturating_sub(4)..];
        f.debug_struct("CardData")
            .field("number", &format!("****{}", last4))
            .field("holder", &self.holder)
            .field("expires", &self.expires)
            .field("cvc", &"<REDACTED>")
            .finish()
    }
}

/// Free-text note fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
    pub title: String,
    pub text: String,
}

/// Login/password pair for some external resource
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialData {
    pub resource: String,
    pub login: String,
    pub password: String,
}

impl fmt::Debug for CredentialData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialData")
            .field("resource", &self.resource)
            .field("login", &self.login)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Row as the storage adapter hands it back: metadata still encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord<T> {
    pub id: i64,
    pub owner_id: UserId,
    pub data: T,
    pub raw_metadata: Vec<u8>,
}

/// Record as returned to its owner: metadata decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record<T> {
    pub id: i64,
    pub owner_id: UserId,
    #[serde(flatten)]
    pub data: T,
    pub metadata: Metadata,
}

/// Body of register and login calls
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

/// Body of card-add calls
#[derive(Debug, Clone, Deserialize)]
pub struct CardAddRequest {
    #[serde(flatten)]
    pub card: CardData,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Body of note-add calls and inbound note-stream frames
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteAddRequest {
    #[serde(flatten)]
    pub note: NoteData,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Body of credential-add calls
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialAddRequest {
    #[serde(flatten)]
    pub credential: CredentialData,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One reply per inbound note-stream frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamReply {
    pub fn saved(id: i64) -> Self {
        Self {
            ok: true,
            id: Some(id),
            code: None,
            error: None,
        }
    }

    pub fn failed(err: &KeeperError) -> Self {
        Self {
            ok: false,
            id: None,
            code: Some(err.status().as_str().to_string()),
            error: Some(err.user_message()),
        }
    }
}
