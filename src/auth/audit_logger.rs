// Authentication audit trail

use crate::auth::fingerprint::TokenFingerprint;
use crate::auth::interceptor::Operation;
use crate::core::models::UserId;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// Authentication event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    AuthSuccess { user_id: UserId },
    AuthFailure { reason: String },
}

impl AuthEvent {
    fn kind(&self) -> &'static str {
        match self {
            AuthEvent::AuthSuccess { .. } => "AUTH_SUCCESS",
            AuthEvent::AuthFailure { .. } => "AUTH_FAILURE",
        }
    }
}

/// Who made the call, as far as the transport can tell
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Audit logger for authentication decisions
///
/// Records carry the token fingerprint, never the token itself.
pub struct AuditLogger {
    db_pool: Option<Arc<PgPool>>,
}

impl AuditLogger {
    /// Create a new audit logger
    ///
    /// Without a pool only structured logging is used.
    pub fn new(db_pool: Option<Arc<PgPool>>) -> Self {
        Self { db_pool }
    }

    /// Record one authentication decision
    ///
    /// Fire-and-forget: the write happens on a spawned task and its failure
    /// never reaches the call being audited.
    pub fn log_auth_event(
        &self,
        event: AuthEvent,
        operation: Operation,
        fingerprint: Option<&TokenFingerprint>,
        client: &ClientInfo,
    ) {
        let db_pool = self.db_pool.clone();
        let fingerprint = fingerprint.map(|f| f.as_str().to_string());
        let client = client.clone();

        tokio::spawn(async move {
            match &event {
                AuthEvent::AuthSuccess { user_id } => {
                    info!(
                        operation = operation.name(),
                        user_id = %user_id,
                        token_fingerprint = ?fingerprint,
                        ip_address = ?client.ip_address,
                        user_agent = ?client.user_agent,
                        "Authentication successful"
                    );
                }
                AuthEvent::AuthFailure { reason } => {
                    warn!(
                        operation = operation.name(),
                        token_fingerprint = ?fingerprint,
                        ip_address = ?client.ip_address,
                        user_agent = ?client.user_agent,
                        reason = %reason,
                        "Authentication failed"
                    );
                }
            }

            if let Some(pool) = db_pool {
                let user_id = match &event {
                    AuthEvent::AuthSuccess { user_id } => Some(user_id.get()),
                    AuthEvent::AuthFailure { .. } => None,
                };
                let reason = match &event {
                    AuthEvent::AuthSuccess { .. } => None,
                    AuthEvent::AuthFailure { reason } => Some(reason.as_str()),
                };

                // INET column: NULL when the address is unknown
                if let Err(e) = sqlx::query(
                    "INSERT INTO auth_audit_log (token_fingerprint, user_id, operation, event_type, reason, ip_address, user_agent, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6::inet, $7, NOW())",
                )
                .bind(&fingerprint)
                .bind(user_id)
                .bind(operation.name())
                .bind(event.kind())
                .bind(reason)
                .bind(client.ip_address.as_deref())
                .bind(client.user_agent.as_deref())
                .execute(pool.as_ref())
                .await
                {
                    warn!(error = %e, "Failed to write audit log to database");
                }
            }
        });
    }
}
