//! Database and schema tests
//!
//! Tests SQLite migrations, repository ordering, and schema constraints

mod common;

use chrono::{Duration, Utc};
use common::{FakeCompletion, setup_test_db, test_config};
use di::Ref;
use homeopath_chat_api::compose;
use homeopath_chat_api::core::traits::CompletionProvider;
use homeopath_chat_api::infrastructure::database::DatabaseConnection;
use homeopath_chat_api::infrastructure::entities::{Conversation, Message, MessageKind, User};
use homeopath_chat_api::infrastructure::traits::{
    ConversationRepository, StoreError, UserRepository,
};
use uuid::Uuid;

fn repositories(
    db: &DatabaseConnection,
) -> (Ref<dyn ConversationRepository>, Ref<dyn UserRepository>) {
    let completions: Ref<dyn CompletionProvider> = Ref::new(FakeCompletion::replying("unused"));
    let services = compose(test_config(true), completions, Some(db.clone())).unwrap();

    (
        services
            .provider
            .get_required::<dyn ConversationRepository>(),
        services.provider.get_required::<dyn UserRepository>(),
    )
}

fn conversation(user: Uuid) -> Conversation {
    Conversation {
        id: Uuid::new_v4(),
        user,
        title: "Test".to_owned(),
        created_at: Utc::now(),
    }
}

fn message(conversation_id: Uuid, kind: MessageKind, text: &str) -> Message {
    Message {
        id: Uuid::new_v4(),
        conversation_id,
        kind,
        created_at: Utc::now(),
        text: text.to_owned(),
    }
}

#[tokio::test]
async fn test_database_migrations_work() {
    let db = setup_test_db().await;

    let tables: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&*db)
            .await
            .unwrap();
    let tables: Vec<String> = tables.into_iter().map(|(name,)| name).collect();

    for expected in ["conversations", "messages", "users"] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }
}

#[tokio::test]
async fn test_message_kinds_survive_storage() {
    let db = setup_test_db().await;
    let (conversations, _) = repositories(&db);

    let created = conversations
        .create_conversation(conversation(Uuid::new_v4()))
        .await
        .unwrap();

    for (kind, text) in [
        (MessageKind::System, "system"),
        (MessageKind::User, "user"),
        (MessageKind::Assistant, "assistant"),
    ] {
        conversations
            .create_message_in_conversation(message(created.id, kind, text))
            .await
            .unwrap();
    }

    let stored = conversations
        .list_conversation_messages(created.id)
        .await
        .unwrap();
    let kinds: Vec<MessageKind> = stored.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![MessageKind::System, MessageKind::User, MessageKind::Assistant]
    );
}

#[tokio::test]
async fn test_same_timestamp_keeps_insertion_order() {
    let db = setup_test_db().await;
    let (conversations, _) = repositories(&db);
    let user = Uuid::new_v4();
    let created_at = Utc::now() - Duration::hours(1);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let mut c = conversation(user);
        c.created_at = created_at;
        ids.push(conversations.create_conversation(c).await.unwrap().id);
    }

    let listed: Vec<Uuid> = conversations
        .list_conversations(user)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();

    ids.reverse();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn test_message_requires_existing_conversation() {
    let db = setup_test_db().await;
    let (conversations, _) = repositories(&db);

    let result = conversations
        .create_message_in_conversation(message(Uuid::new_v4(), MessageKind::User, "orphan"))
        .await;

    assert!(matches!(result, Err(StoreError::Database(_))));
}

#[tokio::test]
async fn test_conversation_cascade_delete() {
    let db = setup_test_db().await;
    let (conversations, _) = repositories(&db);

    let created = conversations
        .create_conversation(conversation(Uuid::new_v4()))
        .await
        .unwrap();
    conversations
        .create_message_in_conversation(message(created.id, MessageKind::User, "Test"))
        .await
        .unwrap();

    sqlx::query("DELETE FROM conversations WHERE id = ?")
        .bind(created.id)
        .execute(&*db)
        .await
        .unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
        .bind(created.id)
        .fetch_one(&*db)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_user_email_is_unique() {
    let db = setup_test_db().await;
    let (_, users) = repositories(&db);

    let user = |email: &str| User {
        id: Uuid::new_v4(),
        name: "Anna".to_owned(),
        email: email.to_owned(),
        password_hash: "hash".to_owned(),
        created_at: Utc::now(),
    };

    users.create_user(user("anna@example.com")).await.unwrap();
    let duplicate = users.create_user(user("anna@example.com")).await;

    match duplicate {
        Err(StoreError::Database(sqlx::Error::Database(e))) => assert!(e.is_unique_violation()),
        other => panic!("expected unique violation, got {other:?}"),
    }

    let found = users.find_by_email("anna@example.com").await.unwrap();
    assert_eq!(found.unwrap().name, "Anna");
    assert!(users.find_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_ping() {
    let db = setup_test_db().await;
    let (conversations, _) = repositories(&db);

    assert!(conversations.ping().await.is_ok());

    db.close().await;
    assert!(conversations.ping().await.is_err());
}
