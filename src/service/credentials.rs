// Login/password records for external resources

use super::{decode_records, encode_metadata, require_text};
use crate::auth::interceptor::AuthenticatedContext;
use crate::core::errors::KeeperError;
use crate::core::models::{CredentialAddRequest, CredentialData, Record};
use crate::storage::SecretStore;
use std::sync::Arc;
use tracing::info;

pub struct CredentialService {
    store: Arc<dyn SecretStore>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub async fn add(
        &self,
        ctx: &AuthenticatedContext,
        request: CredentialAddRequest,
    ) -> Result<i64, KeeperError> {
        ctx.ensure_active()?;
        validate_credential(&request.credential)?;
        let metadata = encode_metadata(&request.metadata)?;

        ctx.ensure_active()?;
        let owner = ctx.principal().user_id;
        let id = self
            .store
            .credential_add(owner, &request.credential, metadata)
            .await?;

        info!(user_id = %owner, credential_id = id, "Credential stored");
        Ok(id)
    }

    pub async fn list(
        &self,
        ctx: &AuthenticatedContext,
    ) -> Result<Vec<Record<CredentialData>>, KeeperError> {
        ctx.ensure_active()?;
        let rows = self.store.credential_list(ctx.principal().user_id).await?;
        decode_records(ctx, rows)
    }

    pub async fn delete(&self, ctx: &AuthenticatedContext, id: i64) -> Result<(), KeeperError> {
        ctx.ensure_active()?;
        let owner = ctx.principal().user_id;
        self.store.credential_delete(owner, id).await?;

        info!(user_id = %owner, credential_id = id, "Credential deleted");
        Ok(())
    }
}

pub fn validate_credential(credential: &CredentialData) -> Result<(), KeeperError> {
    require_text("credential resource", &credential.resource)?;
    require_text("credential login", &credential.login)?;
    // Whitespace is a legal password; only the empty string is refused.
    if credential.password.is_empty() {
        return Err(KeeperError::Validation("credential password is empty".to_string()));
    }
    Ok(())
}
