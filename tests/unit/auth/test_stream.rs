// Unit tests for gated streams driving the note service

use crate::common::{interceptor, token_for, CountingStore};
use async_trait::async_trait;
use keeper::auth::interceptor::{
    Allowlist, CallContext, CallMetadata, GatedStream, Operation, RequestInterceptor, SESSION_TOKEN_KEY,
};
use keeper::auth::token::TokenVerifier;
use keeper::config::Config;
use keeper::auth::stream::{MessageStream, ServerStream};
use keeper::core::errors::{KeeperError, TokenError};
use keeper::core::models::{NoteAddRequest, NoteData, StreamReply};
use keeper::metadata::Metadata;
use keeper::service::NoteService;
use keeper::storage::SecretStore;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct NoteFrames {
    context: CallContext,
    inbound: VecDeque<Result<NoteAddRequest, KeeperError>>,
    replies: Vec<StreamReply>,
    cancel_after: Option<usize>,
}

#[async_trait]
impl MessageStream for NoteFrames {
    type Inbound = NoteAddRequest;
    type Outbound = StreamReply;

    async fn recv(&mut self) -> Option<Result<NoteAddRequest, KeeperError>> {
        self.inbound.pop_front()
    }

    async fn send(&mut self, message: StreamReply) -> Result<(), KeeperError> {
        self.replies.push(message);
        if Some(self.replies.len()) == self.cancel_after {
            self.context.cancellation().cancel();
        }
        Ok(())
    }
}

impl ServerStream for NoteFrames {
    fn context(&self) -> &CallContext {
        &self.context
    }
}

fn note(title: &str, text: &str) -> NoteAddRequest {
    NoteAddRequest {
        note: NoteData {
            title: title.to_string(),
            text: text.to_string(),
        },
        metadata: Metadata::default(),
    }
}

fn frames(metadata: CallMetadata, inbound: Vec<Result<NoteAddRequest, KeeperError>>) -> NoteFrames {
    NoteFrames {
        context: CallContext::new(Operation::NoteStream, metadata)
            .with_cancellation(CancellationToken::new()),
        inbound: inbound.into(),
        replies: Vec::new(),
        cancel_after: None,
    }
}

#[tokio::test]
async fn test_stream_stores_every_valid_frame_for_principal() {
    let store = Arc::new(CountingStore::new());
    let service = NoteService::new(store.clone());
    let transport = frames(
        CallMetadata::new().with(SESSION_TOKEN_KEY, token_for(9, "stream")),
        vec![
            Ok(note("first", "a")),
            Ok(note("second", "")),
            Err(KeeperError::Validation("invalid note frame".to_string())),
            Ok(note("third", "c")),
        ],
    );

    let GatedStream::Authenticated(mut stream) = interceptor().intercept_stream(transport).unwrap() else {
        panic!("note stream must not be public");
    };
    assert_eq!(stream.principal().user_id.get(), 9);

    let stored = service.serve_stream(&mut stream).await.unwrap();
    assert_eq!(stored, 2);

    let replies = stream.into_inner().replies;
    assert_eq!(replies.len(), 4);
    assert!(replies[0].ok);
    assert!(!replies[1].ok);
    assert_eq!(replies[1].code.as_deref(), Some("invalid_argument"));
    assert!(!replies[2].ok);
    assert!(replies[3].ok);

    let owner = keeper::core::models::UserId::new(9).unwrap();
    let rows = store.note_list(owner).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.owner_id == owner));
}

#[tokio::test]
async fn test_stream_without_token_never_opens() {
    let transport = frames(CallMetadata::new(), vec![Ok(note("t", "x"))]);

    let err = interceptor().intercept_stream(transport).err().unwrap();
    assert!(matches!(err, KeeperError::Token(TokenError::NotPresent)));
}

#[tokio::test]
async fn test_cancellation_stops_stream() {
    let store = Arc::new(CountingStore::new());
    let service = NoteService::new(store.clone());
    let mut transport = frames(
        CallMetadata::new().with(SESSION_TOKEN_KEY, token_for(4, "quitter")),
        vec![Ok(note("one", "1")), Ok(note("two", "2")), Ok(note("three", "3"))],
    );
    transport.cancel_after = Some(1);

    let GatedStream::Authenticated(mut stream) = interceptor().intercept_stream(transport).unwrap() else {
        panic!("note stream must not be public");
    };

    let err = service.serve_stream(&mut stream).await.unwrap_err();
    assert!(matches!(err, KeeperError::Cancelled));
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_allowlisted_note_stream_refused_when_principal_required() {
    let interceptor = RequestInterceptor::with_allowlist(
        Arc::new(TokenVerifier::new(&Config::test_config().token_secret)),
        Allowlist::new([Operation::NoteStream]),
    );
    let transport = frames(CallMetadata::new(), vec![Ok(note("t", "x"))]);

    let gated = interceptor.intercept_stream(transport).unwrap();
    assert!(matches!(gated, GatedStream::Public(_)));

    let err = gated.into_authenticated().err().unwrap();
    assert!(matches!(err, KeeperError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_protected_stream_converts_to_authenticated() {
    let transport = frames(
        CallMetadata::new().with(SESSION_TOKEN_KEY, token_for(14, "direct")),
        Vec::new(),
    );

    let stream = interceptor()
        .intercept_stream(transport)
        .and_then(GatedStream::into_authenticated)
        .unwrap();
    assert_eq!(stream.principal().user_id.get(), 14);
}
