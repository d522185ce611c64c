// Unit tests for application state wiring

use crate::common::{test_app, token_for};
use keeper::api::AppState;
use keeper::auth::auth_middleware::{resolve_operation, AuthState, ROUTE_OPERATIONS};
use keeper::auth::interceptor::{Operation, RequestInterceptor, PUBLIC_OPERATIONS};
use keeper::auth::stream::AuthenticatedStream;
use keeper::api::stream::WsStream;
use axum::http::Method;
use static_assertions::assert_impl_all;

assert_impl_all!(AppState: Clone, Send, Sync);
assert_impl_all!(AuthState: Clone, Send, Sync);
assert_impl_all!(RequestInterceptor: Send, Sync);
assert_impl_all!(AuthenticatedStream<WsStream>: Send);

#[test]
fn test_every_route_maps_to_distinct_operation() {
    let mut seen = std::collections::HashSet::new();
    for (method, route, operation) in ROUTE_OPERATIONS {
        let method = Method::from_bytes(method.as_bytes()).unwrap();
        assert_eq!(resolve_operation(&method, route), Some(*operation));
        assert!(seen.insert(*operation), "{:?} mapped twice", operation);
    }
    assert_eq!(seen.len(), 13);
}

#[test]
fn test_public_operations_are_routed() {
    for operation in PUBLIC_OPERATIONS {
        assert!(ROUTE_OPERATIONS.iter().any(|(_, _, op)| op == operation));
    }
}

#[test]
fn test_unknown_route_has_no_operation() {
    assert_eq!(resolve_operation(&Method::GET, "/v1/secrets"), None);
    assert_eq!(resolve_operation(&Method::PUT, "/v1/cards"), None);
    assert_eq!(resolve_operation(&Method::GET, "/v1/notes/:id"), None);
}

#[test]
fn test_operation_names_are_qualified() {
    assert_eq!(Operation::CardAdd.name(), "keeper.Keeper/CardAdd");
    assert_eq!(Operation::NoteStream.name(), "keeper.Keeper/NoteStream");
}

#[tokio::test]
async fn test_router_builds_from_test_config() {
    let app = test_app();
    assert_eq!(app.store.writes(), 0);
    assert!(!token_for(1, "smoke").is_empty());
}
