// Unit tests for the request interceptor

use crate::common::{interceptor, issuer, token_for};
use chrono::{Duration, Utc};
use keeper::auth::interceptor::{
    Admission, Allowlist, CallContext, CallMetadata, Operation, RequestInterceptor,
    PUBLIC_OPERATIONS, SESSION_TOKEN_KEY,
};
use keeper::auth::token::{TokenIssuer, TokenVerifier};
use keeper::core::errors::{KeeperError, Status, TokenError};
use secrecy::Secret;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn call_with_token(operation: Operation, token: &str) -> CallContext {
    CallContext::new(operation, CallMetadata::new().with(SESSION_TOKEN_KEY, token))
}

#[test]
fn test_public_operations_skip_verification() {
    let interceptor = interceptor();
    for operation in PUBLIC_OPERATIONS {
        let admission = interceptor
            .admit(CallContext::new(*operation, CallMetadata::new()))
            .unwrap();
        assert!(matches!(admission, Admission::Public(_)), "{:?}", operation);
        assert!(admission.principal().is_none());
    }
}

#[test]
fn test_public_operation_ignores_garbage_token() {
    let admission = interceptor()
        .admit(call_with_token(Operation::Login, "garbage"))
        .unwrap();
    assert!(matches!(admission, Admission::Public(_)));
}

#[test]
fn test_protected_operation_requires_token() {
    let err = interceptor()
        .admit(CallContext::new(Operation::CardList, CallMetadata::new()))
        .unwrap_err();
    assert!(matches!(err, KeeperError::Token(TokenError::NotPresent)));
    assert_eq!(err.status(), Status::Unauthenticated);
}

#[test]
fn test_valid_token_yields_principal() {
    let admission = interceptor()
        .admit(call_with_token(Operation::NoteAdd, &token_for(42, "anna")))
        .unwrap();

    let principal = admission.principal().unwrap();
    assert_eq!(principal.user_id.get(), 42);
    assert_eq!(principal.login, "anna");
    assert_eq!(admission.call().operation(), Operation::NoteAdd);
}

#[test]
fn test_metadata_key_is_case_insensitive() {
    let call = CallContext::new(
        Operation::CardList,
        CallMetadata::new().with("Session_Token", token_for(5, "case")),
    );
    assert!(interceptor().admit(call).is_ok());
}

#[test]
fn test_two_tokens_are_malformed() {
    let token = token_for(3, "twice");
    let call = CallContext::new(
        Operation::CardList,
        CallMetadata::new()
            .with(SESSION_TOKEN_KEY, token.clone())
            .with(SESSION_TOKEN_KEY, token),
    );

    let err = interceptor().admit(call).unwrap_err();
    assert!(matches!(err, KeeperError::Token(TokenError::Malformed(_))));
}

#[test]
fn test_expired_token_rejected() {
    let stale = issuer()
        .issue_at(7, "late", Utc::now() - Duration::hours(2))
        .unwrap()
        .session_token;

    let err = interceptor()
        .admit(call_with_token(Operation::CardAdd, &stale))
        .unwrap_err();
    assert!(matches!(err, KeeperError::Token(TokenError::Expired)));
}

#[test]
fn test_token_from_other_key_rejected() {
    let foreign = TokenIssuer::new(
        &Secret::new("someone-elses-key-0123456789abcdefgh".to_string()),
        Duration::hours(1),
    )
    .issue(7, "mallory")
    .unwrap()
    .session_token;

    let err = interceptor()
        .admit(call_with_token(Operation::CardAdd, &foreign))
        .unwrap_err();
    assert!(matches!(err, KeeperError::Token(TokenError::InvalidSignature)));
}

#[test]
fn test_cancelled_call_rejected_before_allowlist() {
    let cancellation = CancellationToken::new();
    cancellation.cancel();
    let call = CallContext::new(Operation::Health, CallMetadata::new()).with_cancellation(cancellation);

    let err = interceptor().admit(call).unwrap_err();
    assert!(matches!(err, KeeperError::Cancelled));
}

#[test]
fn test_custom_allowlist_is_exact() {
    let key = Secret::new("allowlist-test-key-0123456789abcdefg".to_string());
    let interceptor = RequestInterceptor::with_allowlist(
        Arc::new(TokenVerifier::new(&key)),
        Allowlist::new([Operation::Health]),
    );

    assert!(interceptor.allowlist().contains(Operation::Health));
    assert!(!interceptor.allowlist().contains(Operation::Login));

    let err = interceptor
        .admit(CallContext::new(Operation::Login, CallMetadata::new()))
        .unwrap_err();
    assert!(matches!(err, KeeperError::Token(TokenError::NotPresent)));
}

#[tokio::test]
async fn test_intercept_skips_handler_on_rejection() {
    let invoked = AtomicUsize::new(0);

    let result: Result<(), KeeperError> = interceptor()
        .intercept(
            call_with_token(Operation::CardList, "not-a-jwt"),
            |_admission| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

    assert!(matches!(result, Err(KeeperError::Token(TokenError::Malformed(_)))));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_intercept_passes_handler_result_through() {
    let user_id = interceptor()
        .intercept(
            call_with_token(Operation::CardList, &token_for(11, "bob")),
            |admission| async move {
                let principal = admission
                    .principal()
                    .ok_or_else(|| KeeperError::Internal("no principal".to_string()))?;
                Ok(principal.user_id.get())
            },
        )
        .await
        .unwrap();

    assert_eq!(user_id, 11);
}
