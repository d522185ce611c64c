// Session tokens: HS256 JWT issuing and verification

use crate::auth::fingerprint::TokenFingerprint;
use crate::core::errors::TokenError;
use crate::core::models::{Principal, UserId};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims carried by every session token
///
/// `sub` is the decimal user id; JWT requires it to be a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub login: String,
    pub iat: i64,
    pub exp: i64,
}

/// Freshly minted token and its expiry
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints session tokens for verified identities
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    validity: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &Secret<String>, validity: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            validity,
        }
    }

    /// Issue a token valid from now for the configured window
    pub fn issue(&self, user_id: i64, login: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, login, Utc::now())
    }

    /// Issue a token as if the current time were `issued_at`
    ///
    /// The identity is checked before anything is signed.
    pub fn issue_at(
        &self,
        user_id: i64,
        login: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        if user_id <= 0 {
            return Err(TokenError::InvalidIdentity(format!(
                "user id must be positive, got {}",
                user_id
            )));
        }
        if login.is_empty() {
            return Err(TokenError::InvalidIdentity("login is empty".to_string()));
        }

        let expires_at = issued_at + self.validity;
        let claims = SessionClaims {
            sub: user_id.to_string(),
            login: login.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let session_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            session_token,
            expires_at,
        })
    }
}

/// Validates session tokens and classifies failures
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &Secret<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify a token and resolve the principal it names
    ///
    /// The signature is checked before expiry, so a forged token is reported
    /// as `InvalidSignature` even when its `exp` has also lapsed.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::NotPresent);
        }

        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let classified = classify(e.kind());
                debug!(error = %e, classified = %classified, "Session token rejected");
                classified
            })?;
        let claims = data.claims;

        let raw_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| TokenError::Malformed(format!("subject '{}' is not numeric", claims.sub)))?;
        let user_id = UserId::new(raw_id).ok_or(TokenError::InvalidPrincipal(raw_id))?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| TokenError::Malformed("expiry out of range".to_string()))?;

        Ok(Principal {
            user_id,
            login: claims.login,
            issued_via: TokenFingerprint::of(token),
            expires_at,
        })
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidToken => TokenError::Malformed("not a JWT".to_string()),
        ErrorKind::Base64(_) => TokenError::Malformed("bad base64 segment".to_string()),
        ErrorKind::Json(_) | ErrorKind::Utf8(_) => TokenError::Malformed("bad claims".to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            TokenError::Malformed(format!("missing claim '{}'", claim))
        }
        ErrorKind::InvalidAlgorithm => TokenError::Malformed("unexpected algorithm".to_string()),
        other => TokenError::Malformed(format!("{:?}", other)),
    }
}
