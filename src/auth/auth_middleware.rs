// Axum authentication middleware

use crate::api::middleware::request_id_from;
use crate::api::responses::ApiError;
use crate::auth::audit_logger::{AuditLogger, AuthEvent, ClientInfo};
use crate::auth::fingerprint::TokenFingerprint;
use crate::auth::interceptor::{
    Admission, CallContext, CallMetadata, Operation, RequestInterceptor, SESSION_TOKEN_KEY,
};
use crate::core::errors::KeeperError;
use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Authentication state containing all dependencies
#[derive(Clone)]
pub struct AuthState {
    pub interceptor: Arc<RequestInterceptor>,
    pub audit_logger: Arc<AuditLogger>,
}

/// Route table: HTTP method and route pattern to operation
pub const ROUTE_OPERATIONS: &[(&str, &str, Operation)] = &[
    ("GET", "/health", Operation::Health),
    ("POST", "/v1/auth/register", Operation::Register),
    ("POST", "/v1/auth/login", Operation::Login),
    ("POST", "/v1/cards", Operation::CardAdd),
    ("GET", "/v1/cards", Operation::CardList),
    ("DELETE", "/v1/cards/:id", Operation::CardDelete),
    ("POST", "/v1/notes", Operation::NoteAdd),
    ("GET", "/v1/notes", Operation::NoteList),
    ("DELETE", "/v1/notes/:id", Operation::NoteDelete),
    ("GET", "/v1/notes/stream", Operation::NoteStream),
    ("POST", "/v1/credentials", Operation::CredentialAdd),
    ("GET", "/v1/credentials", Operation::CredentialList),
    ("DELETE", "/v1/credentials/:id", Operation::CredentialDelete),
];

/// Resolve the operation a matched route serves
pub fn resolve_operation(method: &Method, route: &str) -> Option<Operation> {
    ROUTE_OPERATIONS
        .iter()
        .find(|(m, path, _)| *m == method.as_str() && *path == route)
        .map(|(_, _, operation)| *operation)
}

/// Authentication middleware function
///
/// Runs every routed request through the [`RequestInterceptor`]. On admission
/// the resulting context is placed in the request extensions: an
/// `AuthenticatedContext` for protected operations, the plain `CallContext`
/// for allowlisted ones. On rejection the handler never runs.
///
/// The call's cancellation token is cancelled if this future is dropped
/// before the handler returns (client disconnect or timeout).
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = request_id_from(request.headers());

    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    let operation = resolve_operation(request.method(), &route).ok_or_else(|| {
        error!(method = %request.method(), route = %route, "Route has no operation mapping");
        ApiError::from(KeeperError::Internal("unmapped route".to_string()))
            .with_request_id(request_id.clone())
    })?;

    let client = ClientInfo {
        ip_address: extract_ip_address(request.headers()),
        user_agent: extract_user_agent(request.headers()),
    };

    let cancellation = CancellationToken::new();
    let call = CallContext::new(operation, CallMetadata::from_headers(request.headers()))
        .with_cancellation(cancellation.clone());
    let fingerprint = session_fingerprint(call.metadata());
    let guard = cancellation.drop_guard();

    let audit_logger = &auth_state.audit_logger;
    let fingerprint_ref = fingerprint.as_ref();
    let client_ref = &client;

    let outcome = auth_state
        .interceptor
        .intercept(call, |admission| async move {
            let mut request = request;
            match admission {
                Admission::Public(call) => {
                    request.extensions_mut().insert(call);
                }
                Admission::Authenticated(ctx) => {
                    audit_logger.log_auth_event(
                        AuthEvent::AuthSuccess {
                            user_id: ctx.principal().user_id,
                        },
                        operation,
                        fingerprint_ref,
                        client_ref,
                    );
                    request.extensions_mut().insert(ctx.call().clone());
                    request.extensions_mut().insert(ctx);
                }
            }
            Ok(next.run(request).await)
        })
        .await;

    match outcome {
        Ok(response) => {
            // Streams outlive the upgrade response; only an abandoned call cancels.
            guard.disarm();
            Ok(response)
        }
        Err(e) => {
            if !matches!(e, KeeperError::Cancelled) {
                audit_logger.log_auth_event(
                    AuthEvent::AuthFailure {
                        reason: e.to_string(),
                    },
                    operation,
                    fingerprint.as_ref(),
                    &client,
                );
            }
            Err(ApiError::from(e).with_request_id(request_id))
        }
    }
}

/// Fingerprint of the session token a call carries, as the verifier sees it
pub fn session_fingerprint(metadata: &CallMetadata) -> Option<TokenFingerprint> {
    metadata
        .get(SESSION_TOKEN_KEY)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(TokenFingerprint::of)
}

/// Extract IP address from request headers
///
/// Checks `X-Forwarded-For` first (for proxied requests), then `X-Real-IP`.
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("X-Real-IP"))
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
}

/// Extract user agent from request headers
fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
