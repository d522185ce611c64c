// Axum web server layer

use axum::{
    error_handling::HandleErrorLayer,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod stream;

use crate::auth::audit_logger::AuditLogger;
use crate::auth::auth_middleware::{auth_middleware, AuthState};
use crate::auth::interceptor::RequestInterceptor;
use crate::auth::token::{TokenIssuer, TokenVerifier};
use crate::config::Config;
use crate::service::{CardService, CredentialService, NoteService, UserService};
use crate::storage::{SecretStore, UserStore};

/// Application state shared by all handlers
///
/// Everything is behind `Arc`; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub cards: Arc<CardService>,
    pub notes: Arc<NoteService>,
    pub credentials: Arc<CredentialService>,
    pub users: Arc<UserService>,
    pub store: Arc<dyn SecretStore>,
    pub config: Arc<Config>,
    /// Gate for streams opened after an upgrade
    pub interceptor: Arc<RequestInterceptor>,
    /// Cancelled on server shutdown; open streams run under child tokens
    pub shutdown: CancellationToken,
}

/// Wire services, the token pair and the interceptor from one configuration
///
/// `db_pool`, when present, also receives audit records.
pub fn build_state(
    config: Arc<Config>,
    secrets: Arc<dyn SecretStore>,
    users: Arc<dyn UserStore>,
    db_pool: Option<Arc<PgPool>>,
) -> (AppState, Arc<AuthState>) {
    let issuer = Arc::new(TokenIssuer::new(&config.token_secret, config.token_ttl()));
    let verifier = Arc::new(TokenVerifier::new(&config.token_secret));

    let interceptor = Arc::new(RequestInterceptor::new(verifier));
    let auth_state = Arc::new(AuthState {
        interceptor: interceptor.clone(),
        audit_logger: Arc::new(AuditLogger::new(db_pool)),
    });

    let app_state = AppState {
        cards: Arc::new(CardService::new(secrets.clone())),
        notes: Arc::new(NoteService::new(secrets.clone())),
        credentials: Arc::new(CredentialService::new(secrets.clone())),
        users: Arc::new(UserService::new(users, issuer)),
        store: secrets,
        config,
        interceptor,
        shutdown: CancellationToken::new(),
    };

    (app_state, auth_state)
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Request ID assignment (tower-http::request_id)
/// - Tracing (tower-http::trace)
/// - Request ID echoed on the response
/// - Error envelope: every error body is JSON and carries the request ID
/// - Request timeout (tower::timeout), errors mapped by `HandleErrorLayer`
/// - Panic recovery (tower-http::catch_panic), 500 JSON body
/// - Body size limit (tower-http::limit)
/// - Auth middleware, on every matched route; the interceptor's allowlist
///   decides which operations skip verification
pub fn create_router(app_state: AppState, auth_state: Arc<AuthState>) -> Router {
    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    let router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/v1/auth/register", post(handlers::register_handler))
        .route("/v1/auth/login", post(handlers::login_handler))
        .route(
            "/v1/cards",
            post(handlers::card_add_handler).get(handlers::card_list_handler),
        )
        .route("/v1/cards/:id", delete(handlers::card_delete_handler))
        .route(
            "/v1/notes",
            post(handlers::note_add_handler).get(handlers::note_list_handler),
        )
        .route("/v1/notes/stream", get(handlers::note_stream_handler))
        .route("/v1/notes/:id", delete(handlers::note_delete_handler))
        .route(
            "/v1/credentials",
            post(handlers::credential_add_handler).get(handlers::credential_list_handler),
        )
        .route(
            "/v1/credentials/:id",
            delete(handlers::credential_delete_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(app_state);

    // HandleErrorLayer must come before timeout to catch the timeout error
    let timeout_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(middleware::handle_timeout_error))
        .timeout(Duration::from_secs(timeout_secs));

    router
        .layer(middleware::body_size_limit_layer(body_limit))
        .layer(middleware::catch_panic_layer())
        .layer(timeout_stack)
        .layer(axum::middleware::from_fn(middleware::error_envelope))
        .layer(middleware::propagate_request_id_layer())
        .layer(middleware::tracing_layer())
        .layer(middleware::set_request_id_layer())
}
