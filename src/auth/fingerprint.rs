// Session token fingerprinting for logs and audit records

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of a session token (64-character hex string)
///
/// Audit records and log lines carry this instead of the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenFingerprint(String);

impl TokenFingerprint {
    /// Fingerprint a raw token string
    pub fn of(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, enough to correlate log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for TokenFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
