// Domain error types - classified failures with no information disclosure

use thiserror::Error;

/// Client-facing status of a failed call
///
/// Every domain error collapses into exactly one of these. The status is what
/// the terminal client branches on ("log in again", "fix your input", "retry
/// later"); the accompanying message carries the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Unauthenticated,
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Cancelled,
    Internal,
}

impl Status {
    /// Stable machine-readable code used in error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unauthenticated => "unauthenticated",
            Status::InvalidArgument => "invalid_argument",
            Status::NotFound => "not_found",
            Status::AlreadyExists => "already_exists",
            Status::Cancelled => "cancelled",
            Status::Internal => "internal",
        }
    }

    /// HTTP status code for this status
    pub fn http_code(&self) -> u16 {
        match self {
            Status::Unauthenticated => 401,
            Status::InvalidArgument => 400,
            Status::NotFound => 404,
            Status::AlreadyExists => 409,
            // Client closed request (nginx convention)
            Status::Cancelled => 499,
            Status::Internal => 500,
        }
    }
}

/// Session token issuing and verification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No token was supplied with the call
    #[error("session token missing")]
    NotPresent,

    /// Token present but structurally unparseable or ambiguous
    #[error("session token malformed: {0}")]
    Malformed(String),

    /// Token parsed but the signature does not match the server key
    #[error("session token signature invalid")]
    InvalidSignature,

    /// Signature valid, expiry in the past
    #[error("session token expired")]
    Expired,

    /// Refused to issue a token for an unusable identity
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Well-formed, correctly signed token naming a non-positive user id
    #[error("session token names invalid user id {0}")]
    InvalidPrincipal(i64),

    /// Failed to sign token
    #[error("failed to sign session token: {0}")]
    Signing(String),
}

/// Metadata structural violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata entry #{index} has an empty key")]
    EmptyKey { index: usize },

    #[error("metadata key '{key}' has an empty value")]
    EmptyValue { key: String },

    /// `key` holds a truncated prefix of the offending key
    #[error("metadata key '{key}...' exceeds {max} characters")]
    KeyTooLong { key: String, max: usize },

    #[error("metadata value for key '{key}' exceeds {max} characters")]
    ValueTooLong { key: String, max: usize },

    #[error("metadata key '{key}' contains whitespace")]
    KeyContainsWhitespace { key: String },

    #[error("duplicate metadata key '{key}'")]
    DuplicateKey { key: String },
}

/// Metadata encoding/decoding failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("metadata codec error: {0}")]
pub struct CodecError(pub String);

/// Storage adapter errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("record not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::AlreadyExists(db.message().to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Main error type for the keeper services
#[derive(Error, Debug)]
pub enum KeeperError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Record field failed validation (HTTP 400)
    #[error("validation error: {0}")]
    Validation(String),

    /// Call carries no usable principal or credentials were rejected (HTTP 401)
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller went away or the request timed out
    #[error("call cancelled")]
    Cancelled,

    /// Configuration error (startup only)
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl KeeperError {
    /// Classify this error into its client-facing status
    pub fn status(&self) -> Status {
        match self {
            KeeperError::Token(TokenError::InvalidIdentity(_))
            | KeeperError::Token(TokenError::InvalidPrincipal(_)) => Status::InvalidArgument,
            KeeperError::Token(TokenError::Signing(_)) => Status::Internal,
            KeeperError::Token(_) => Status::Unauthenticated,
            KeeperError::Metadata(_) | KeeperError::Validation(_) => Status::InvalidArgument,
            KeeperError::Codec(_) => Status::Internal,
            KeeperError::Store(StoreError::NotFound) => Status::NotFound,
            KeeperError::Store(StoreError::AlreadyExists(_)) => Status::AlreadyExists,
            KeeperError::Store(StoreError::Backend(_)) => Status::Internal,
            KeeperError::Unauthenticated(_) => Status::Unauthenticated,
            KeeperError::Cancelled => Status::Cancelled,
            KeeperError::Configuration(_) | KeeperError::Internal(_) => Status::Internal,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.status().http_code()
    }

    /// Get user-facing error message (no internal details)
    pub fn user_message(&self) -> String {
        match self.status() {
            Status::Internal => "internal error".to_string(),
            Status::NotFound => "record not found".to_string(),
            Status::AlreadyExists => match self {
                KeeperError::Store(StoreError::AlreadyExists(_)) => "already exists".to_string(),
                other => other.to_string(),
            },
            _ => self.to_string(),
        }
    }
}
