// Unit tests for the ownership-enforcing record services

use crate::common::{authenticated, CountingStore};
use keeper::auth::interceptor::Operation;
use keeper::core::errors::{KeeperError, MetadataError, Status, StoreError};
use keeper::core::models::{
    CardAddRequest, CardData, CredentialAddRequest, CredentialData, NoteAddRequest, NoteData,
    UserId,
};
use keeper::metadata::Metadata;
use keeper::service::{CardService, CredentialService, NoteService};
use std::sync::Arc;

fn tinkoff_card() -> CardAddRequest {
    CardAddRequest {
        card: CardData {
            number: "5536 9137 1234 5678".to_string(),
            holder: "IVAN PETROV".to_string(),
            expires: "09/27".to_string(),
            cvc: "123".to_string(),
        },
        metadata: [("bank", "Tinkoff")].into_iter().collect(),
    }
}

fn note(text: &str, metadata: Metadata) -> NoteAddRequest {
    NoteAddRequest {
        note: NoteData {
            title: "groceries".to_string(),
            text: text.to_string(),
        },
        metadata,
    }
}

#[tokio::test]
async fn test_card_is_listed_only_for_its_owner() {
    let store = Arc::new(CountingStore::new());
    let cards = CardService::new(store.clone());

    let owner = authenticated(18, Operation::CardAdd);
    let id = cards.add(&owner, tinkoff_card()).await.unwrap();

    let listed = cards.list(&authenticated(18, Operation::CardList)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].owner_id, UserId::new(18).unwrap());
    assert_eq!(listed[0].metadata.get("bank"), Some("Tinkoff"));

    let other = cards.list(&authenticated(19, Operation::CardList)).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn test_invalid_note_never_reaches_storage() {
    let store = Arc::new(CountingStore::new());
    let notes = NoteService::new(store.clone());
    let ctx = authenticated(3, Operation::NoteAdd);

    let err = notes.add(&ctx, note("", Metadata::default())).await.unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);

    let duplicate = [("k", "v1"), ("k", "v2")].into_iter().collect();
    let err = notes.add(&ctx, note("milk", duplicate)).await.unwrap_err();
    assert!(matches!(
        err,
        KeeperError::Metadata(MetadataError::DuplicateKey { ref key }) if key == "k"
    ));

    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_delete_of_foreign_record_is_not_found() {
    let store = Arc::new(CountingStore::new());
    let credentials = CredentialService::new(store.clone());

    let id = credentials
        .add(
            &authenticated(10, Operation::CredentialAdd),
            CredentialAddRequest {
                credential: CredentialData {
                    resource: "mail.example.com".to_string(),
                    login: "alice".to_string(),
                    password: "s3cret".to_string(),
                },
                metadata: Metadata::default(),
            },
        )
        .await
        .unwrap();

    let err = credentials
        .delete(&authenticated(11, Operation::CredentialDelete), id)
        .await
        .unwrap_err();
    assert!(matches!(err, KeeperError::Store(StoreError::NotFound)));
    assert_eq!(err.status(), Status::NotFound);

    // Still there for the real owner
    let owner = authenticated(10, Operation::CredentialList);
    assert_eq!(credentials.list(&owner).await.unwrap().len(), 1);

    credentials
        .delete(&authenticated(10, Operation::CredentialDelete), id)
        .await
        .unwrap();
    assert!(credentials.list(&owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_metadata_fails_listing() {
    let store = Arc::new(CountingStore::new());
    let owner = UserId::new(20).unwrap();
    store.insert_raw_note(owner, b"{not json").await;

    let notes = NoteService::new(store.clone());
    let err = notes
        .list(&authenticated(20, Operation::NoteList))
        .await
        .unwrap_err();

    assert!(matches!(err, KeeperError::Codec(_)));
    assert_eq!(err.status(), Status::Internal);
    assert_eq!(err.user_message(), "internal error");
}

#[tokio::test]
async fn test_backend_failure_is_internal_without_detail() {
    let store = Arc::new(CountingStore::failing_reads());
    let cards = CardService::new(store.clone());

    let err = cards
        .list(&authenticated(5, Operation::CardList))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::Internal);
    assert!(!err.user_message().contains("postgres"));
}

#[tokio::test]
async fn test_card_field_rules() {
    let store = Arc::new(CountingStore::new());
    let cards = CardService::new(store.clone());
    let ctx = authenticated(6, Operation::CardAdd);

    let mutations: [fn(&mut CardData); 5] = [
        |c| c.number = "1234".to_string(),
        |c| c.number = "5536 9137 abcd 5678".to_string(),
        |c| c.holder = "  ".to_string(),
        |c| c.expires = "13/27".to_string(),
        |c| c.cvc = "12".to_string(),
    ];

    for mutate in mutations {
        let mut request = tinkoff_card();
        mutate(&mut request.card);
        let err = cards.add(&ctx, request).await.unwrap_err();
        assert!(matches!(err, KeeperError::Validation(_)), "{:?}", err);
    }

    assert_eq!(store.writes(), 0);
}
