// Request handlers for API endpoints

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{Json, Response},
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::extract::{Authenticated, Call, JsonBody, PathParam};
use crate::api::responses::{ApiError, CreatedResponse, HealthResponse};
use crate::api::stream::WsStream;
use crate::api::AppState;
use crate::auth::interceptor::GatedStream;
use crate::auth::token::IssuedToken;
use crate::core::models::{
    CardAddRequest, CardData, CredentialAddRequest, CredentialData, CredentialsRequest,
    NoteAddRequest, NoteData, Record,
};

/// Health check
///
/// GET /health
///
/// Storage is pinged with a short timeout so the endpoint stays fast.
pub async fn health_handler(State(app_state): State<AppState>) -> Json<HealthResponse> {
    let storage = match tokio::time::timeout(Duration::from_millis(500), app_state.store.ping()).await {
        Ok(Ok(())) => "connected".to_string(),
        Ok(Err(e)) => {
            warn!(error = %e, "Storage ping failed");
            "unavailable".to_string()
        }
        Err(_) => {
            debug!("Storage ping timed out in health check");
            "slow".to_string()
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        storage,
    })
}

/// POST /v1/auth/register
pub async fn register_handler(
    State(app_state): State<AppState>,
    Call(call): Call,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<(StatusCode, Json<IssuedToken>), ApiError> {
    let token = app_state.users.register(&call, request).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// POST /v1/auth/login
pub async fn login_handler(
    State(app_state): State<AppState>,
    Call(call): Call,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<Json<IssuedToken>, ApiError> {
    let token = app_state.users.login(&call, request).await?;
    Ok(Json(token))
}

/// POST /v1/cards
pub async fn card_add_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
    JsonBody(request): JsonBody<CardAddRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = app_state.cards.add(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /v1/cards
pub async fn card_list_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
) -> Result<Json<Vec<Record<CardData>>>, ApiError> {
    Ok(Json(app_state.cards.list(&ctx).await?))
}

/// DELETE /v1/cards/:id
pub async fn card_delete_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    app_state.cards.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/notes
pub async fn note_add_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
    JsonBody(request): JsonBody<NoteAddRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = app_state.notes.add(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /v1/notes
pub async fn note_list_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
) -> Result<Json<Vec<Record<NoteData>>>, ApiError> {
    Ok(Json(app_state.notes.list(&ctx).await?))
}

/// DELETE /v1/notes/:id
pub async fn note_delete_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    app_state.notes.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/notes/stream (WebSocket)
///
/// The upgraded socket is gated once by the interceptor; every frame
/// afterwards runs under the same principal. The stream is cancelled when
/// the peer goes away or the server shuts down.
pub async fn note_stream_handler(
    State(app_state): State<AppState>,
    Call(call): Call,
    ws: WebSocketUpgrade,
) -> Response {
    let call = call.with_cancellation(app_state.shutdown.child_token());

    ws.on_upgrade(move |socket| async move {
        let transport = WsStream::new(socket, call);
        let mut stream = match app_state
            .interceptor
            .intercept_stream(transport)
            .and_then(GatedStream::into_authenticated)
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Note stream refused");
                return;
            }
        };

        let user_id = stream.principal().user_id;
        match app_state.notes.serve_stream(&mut stream).await {
            Ok(stored) => debug!(user_id = %user_id, stored, "Note stream finished"),
            Err(e) => warn!(user_id = %user_id, error = %e, "Note stream aborted"),
        }
    })
}

/// POST /v1/credentials
pub async fn credential_add_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
    JsonBody(request): JsonBody<CredentialAddRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = app_state.credentials.add(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /v1/credentials
pub async fn credential_list_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
) -> Result<Json<Vec<Record<CredentialData>>>, ApiError> {
    Ok(Json(app_state.credentials.list(&ctx).await?))
}

/// DELETE /v1/credentials/:id
pub async fn credential_delete_handler(
    State(app_state): State<AppState>,
    Authenticated(ctx): Authenticated,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    app_state.credentials.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
