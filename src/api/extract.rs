// Typed extractors for admitted calls

use crate::api::responses::ApiError;
use crate::auth::interceptor::{AuthenticatedContext, CallContext};
use crate::core::errors::KeeperError;
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

/// Principal-bearing context placed by the auth middleware
///
/// A handler taking this extractor cannot run for an unauthenticated call.
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthenticatedContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedContext>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| {
                ApiError::from(KeeperError::Unauthenticated(
                    "no authenticated context".to_string(),
                ))
            })
    }
}

/// Call context for any admitted call, public or not
#[derive(Debug, Clone)]
pub struct Call(pub CallContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Call
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallContext>()
            .cloned()
            .map(Call)
            .ok_or_else(|| ApiError::from(KeeperError::Internal("call context missing".to_string())))
    }
}

/// JSON request body; a body that fails to parse answers with an
/// `invalid_argument` error body instead of axum's plain-text rejection
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Path parameters, rejected the same way as [`JsonBody`]
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);
