// Account registration and login

use super::require_text;
use crate::auth::interceptor::CallContext;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::{IssuedToken, TokenIssuer};
use crate::core::errors::KeeperError;
use crate::core::models::CredentialsRequest;
use crate::metadata::MAX_FIELD_CHARS;
use crate::storage::UserStore;
use std::sync::Arc;
use tracing::{info, warn};

const INVALID_CREDENTIALS: &str = "invalid login or password";

pub struct UserService {
    users: Arc<dyn UserStore>,
    issuer: Arc<TokenIssuer>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, issuer: Arc<TokenIssuer>) -> Self {
        Self { users, issuer }
    }

    /// Create an account and issue its first session token
    pub async fn register(
        &self,
        call: &CallContext,
        request: CredentialsRequest,
    ) -> Result<IssuedToken, KeeperError> {
        call.ensure_active()?;
        validate_login(&request.login)?;
        if request.password.is_empty() {
            return Err(KeeperError::Validation("password is empty".to_string()));
        }

        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| KeeperError::Internal(format!("hashing task failed: {}", e)))??;

        call.ensure_active()?;
        let user = self.users.create_user(&request.login, &password_hash).await?;
        let token = self.issuer.issue(user.id.get(), &user.login)?;

        info!(user_id = %user.id, "User registered");
        Ok(token)
    }

    /// Exchange login and password for a session token
    ///
    /// Unknown logins and wrong passwords are reported identically.
    pub async fn login(
        &self,
        call: &CallContext,
        request: CredentialsRequest,
    ) -> Result<IssuedToken, KeeperError> {
        call.ensure_active()?;

        let Some(user) = self.users.find_by_login(&request.login).await? else {
            warn!("Login attempt for unknown account");
            return Err(KeeperError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        };

        let stored_hash = user.password_hash.clone();
        let password = request.password;
        let matches = tokio::task::spawn_blocking(move || verify_password(&stored_hash, &password))
            .await
            .map_err(|e| KeeperError::Internal(format!("verification task failed: {}", e)))?;

        if !matches {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(KeeperError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.issuer.issue(user.id.get(), &user.login)?;
        info!(user_id = %user.id, "User logged in");
        Ok(token)
    }
}

fn validate_login(login: &str) -> Result<(), KeeperError> {
    require_text("login", login)?;
    if login.chars().any(char::is_whitespace) {
        return Err(KeeperError::Validation("login contains whitespace".to_string()));
    }
    if login.chars().count() > MAX_FIELD_CHARS {
        return Err(KeeperError::Validation(format!(
            "login exceeds {} characters",
            MAX_FIELD_CHARS
        )));
    }
    Ok(())
}
