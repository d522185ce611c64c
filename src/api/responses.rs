// Response types for API endpoints

use crate::core::errors::{KeeperError, Status};
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
}

/// Created record id
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// API error type that converts domain errors to HTTP responses
///
/// The rendered response keeps a copy in its extensions so the error
/// envelope can attach the request ID on the way out.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: Status,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: Status, message: String) -> Self {
        let status =
            StatusCode::from_u16(code.http_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            code,
            message,
            request_id: None,
        }
    }

    /// Attach the caller's request ID
    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            code: self.code.as_str().to_string(),
            error: self.message.clone(),
            request_id: self.request_id.clone(),
        });
        let mut response = (self.status, body).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let mut api_error = ApiError::new(Status::InvalidArgument, rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            api_error.status = StatusCode::PAYLOAD_TOO_LARGE;
        }
        api_error
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new(Status::InvalidArgument, rejection.body_text())
    }
}

impl From<KeeperError> for ApiError {
    fn from(err: KeeperError) -> Self {
        ApiError::new(err.status(), err.user_message())
    }
}
