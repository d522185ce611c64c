// Integration tests for the auth middleware and the public allowlist

use crate::common::{body_json, empty_request, issuer, json_request, test_app, token_for};
use axum::{body::Body, http::Request, http::StatusCode};
use chrono::{Duration, Utc};
use keeper::auth::interceptor::SESSION_TOKEN_KEY;
use keeper::auth::token::TokenIssuer;
use secrecy::Secret;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = test_app();
    let response = app
        .router
        .oneshot(empty_request("GET", "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "connected");
}

#[tokio::test]
async fn test_missing_token_rejected_before_handler() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/notes",
            None,
            json!({"title": "t", "text": "x"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "unauthenticated");
    assert_eq!(body["error"], "session token missing");
    assert!(body["request_id"].is_string());
    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn test_rejection_messages_are_distinguishable() {
    let expired = issuer()
        .issue_at(1, "late", Utc::now() - Duration::hours(3))
        .unwrap()
        .session_token;
    let foreign = TokenIssuer::new(
        &Secret::new("unrelated-signing-key-0123456789abcdef".to_string()),
        Duration::hours(1),
    )
    .issue(1, "forged")
    .unwrap()
    .session_token;

    let cases = [
        ("not-a-token", "malformed"),
        (expired.as_str(), "expired"),
        (foreign.as_str(), "signature"),
    ];

    for (token, fragment) in cases {
        let response = test_app()
            .router
            .oneshot(empty_request("GET", "/v1/cards", Some(token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains(fragment), "{} should mention {}", message, fragment);
    }
}

#[tokio::test]
async fn test_repeated_token_header_is_malformed() {
    let token = token_for(2, "twice");
    let request = Request::builder()
        .method("GET")
        .uri("/v1/cards")
        .header(SESSION_TOKEN_KEY, token.as_str())
        .header(SESSION_TOKEN_KEY, token.as_str())
        .body(Body::empty())
        .unwrap();

    let response = test_app().router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("malformed"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let request = Request::builder()
        .method("GET")
        .uri("/v1/credentials")
        .header("x-request-id", "trace-77")
        .body(Body::empty())
        .unwrap();

    let response = test_app().router.oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["request_id"], "trace-77");
}

#[tokio::test]
async fn test_register_and_login_are_public() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({"login": "sveta", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered = body_json(response).await;
    assert!(registered["session_token"].is_string());
    assert!(registered["expires_at"].is_string());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({"login": "sveta", "password": "other"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({"login": "sveta", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthenticated: invalid login or password");

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({"login": "sveta", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["session_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .router
        .oneshot(empty_request("GET", "/v1/notes", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let text = "x".repeat(2 * 1024 * 1024);
    let body = json!({"title": "big", "text": text}).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/notes")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .header(SESSION_TOKEN_KEY, token_for(1, "big"))
        .body(Body::from(body))
        .unwrap();

    let app = test_app();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_argument");
    assert!(body["request_id"].is_string());
    assert_eq!(app.store.writes(), 0);
}
