// Middleware stack for observability and protection

use crate::api::responses::ApiError;
use crate::core::errors::{KeeperError, Status};
use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    BoxError,
};
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    classify::{ServerErrorsAsFailures, SharedClassifier},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, error};

/// Header carrying the caller's request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Panic-to-response conversion used by [`catch_panic_layer`]
pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Tracing middleware
///
/// Logs method, path, status and latency for every request.
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

/// Assign a UUID v4 request ID unless the caller sent one
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Echo the request ID back as a response header
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Request ID from headers, or a fresh UUID when absent
pub fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Error envelope middleware
///
/// Every 4xx/5xx leaving the router is an `ErrorResponse` carrying the
/// request ID. `ApiError` responses get the ID attached; bodies produced
/// elsewhere (unknown routes, body limit, upgrade failures) are replaced.
pub async fn error_envelope(request: Request, next: Next) -> Response {
    let request_id = request_id_from(request.headers());
    let response = next.run(request).await;

    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    match response.extensions().get::<ApiError>() {
        Some(api_error) if api_error.request_id.is_some() => response,
        Some(api_error) => api_error.clone().with_request_id(request_id).into_response(),
        None => {
            debug!(status = status.as_u16(), "Wrapping bare error response");
            envelope_for(status).with_request_id(request_id).into_response()
        }
    }
}

/// `ApiError` standing in for a bare error status
pub fn envelope_for(status: StatusCode) -> ApiError {
    let code = match status {
        StatusCode::UNAUTHORIZED => Status::Unauthenticated,
        StatusCode::NOT_FOUND => Status::NotFound,
        StatusCode::CONFLICT => Status::AlreadyExists,
        StatusCode::REQUEST_TIMEOUT => Status::Cancelled,
        s if s.is_server_error() => Status::Internal,
        _ => Status::InvalidArgument,
    };
    let message = status
        .canonical_reason()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "request failed".to_string());

    let mut api_error = ApiError::new(code, message);
    api_error.status = status;
    api_error
}

/// Body size limit middleware
///
/// Returns 413 Payload Too Large if exceeded.
pub fn body_size_limit_layer(limit: usize) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(limit)
}

/// Convert handler panics into a 500 JSON body
///
/// The panic payload is logged, never returned to the client.
pub fn catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!(panic = %detail, "Handler panicked");
    ApiError::from(KeeperError::Internal(detail)).into_response()
}

/// Map errors raised by the timeout stack to responses
pub async fn handle_timeout_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        let mut api_error = ApiError::new(Status::Cancelled, "request timed out".to_string());
        api_error.status = StatusCode::REQUEST_TIMEOUT;
        api_error
    } else {
        error!(error = %err, "Unhandled middleware error");
        ApiError::from(KeeperError::Internal(err.to_string()))
    }
}
