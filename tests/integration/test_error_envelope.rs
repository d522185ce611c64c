// Integration tests for JSON error bodies across the whole router

use crate::common::{body_json, test_app, test_app_with, token_for, CountingStore};
use axum::{body::Body, http::Request, http::StatusCode};
use keeper::auth::interceptor::SESSION_TOKEN_KEY;
use serde_json::json;
use tower::ServiceExt;

fn traced(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-request-id", "trace-9")
        .header(SESSION_TOKEN_KEY, token_for(30, "tracer"));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_handler_validation_error_carries_request_id() {
    let app = test_app();
    let response = app
        .router
        .oneshot(traced("POST", "/v1/notes", Some(json!({"title": "t", "text": ""}))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-request-id"], "trace-9");
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_argument");
    assert_eq!(body["request_id"], "trace-9");
    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn test_unparseable_body_is_json_invalid_argument() {
    let app = test_app();
    let response = app
        .router
        .oneshot(traced(
            "POST",
            "/v1/notes",
            Some(json!({"title": "t", "text": "x", "metadata": {"k": "v"}})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_argument");
    assert_eq!(body["request_id"], "trace-9");
    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn test_bad_path_id_is_json_invalid_argument() {
    let response = test_app()
        .router
        .oneshot(traced("DELETE", "/v1/notes/abc", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_argument");
    assert_eq!(body["request_id"], "trace-9");
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let response = test_app()
        .router
        .oneshot(traced("GET", "/v1/passports", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "not_found");
    assert_eq!(body["request_id"], "trace-9");
}

#[tokio::test]
async fn test_generated_request_id_matches_header() {
    let request = Request::builder()
        .method("GET")
        .uri("/v1/cards")
        .body(Body::empty())
        .unwrap();

    let response = test_app().router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let header = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = body_json(response).await;
    assert_eq!(body["request_id"], header.as_str());
}

#[tokio::test]
async fn test_handler_panic_through_full_stack_is_opaque_500() {
    let app = test_app_with(CountingStore::panicking());
    let response = app
        .router
        .oneshot(traced("GET", "/v1/cards", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["x-request-id"], "trace-9");
    let body = body_json(response).await;
    assert_eq!(body["code"], "internal");
    assert_eq!(body["error"], "internal error");
    assert_eq!(body["request_id"], "trace-9");
    assert!(!body.to_string().contains("poisoned"));
}
