//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{Conversation, Message, User};
use crate::infrastructure::traits::{ConversationRepository, StoreError, UserRepository};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::error;
use uuid::Uuid;

fn log_error(e: sqlx::Error) -> StoreError {
    error!("{e}");
    StoreError::Database(e)
}

#[injectable(ConversationRepository)]
pub struct DbConversationRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl ConversationRepository for DbConversationRepository {
    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        sqlx::query_as(
            "SELECT id, user, title, created_at FROM conversations WHERE user = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&**self.connection)
        .await
        .map_err(log_error)
    }

    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, StoreError> {
        sqlx::query_as(
            "INSERT INTO conversations (id, user, title, created_at) VALUES (?, ?, ?, ?) RETURNING id, user, title, created_at",
        )
        .bind(conversation.id)
        .bind(conversation.user)
        .bind(conversation.title)
        .bind(conversation.created_at)
        .fetch_one(&**self.connection)
        .await
        .map_err(log_error)
    }

    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, StoreError> {
        sqlx::query_as(
            "SELECT id, conversation_id, kind, created_at, text FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&**self.connection)
        .await
        .map_err(log_error)
    }

    async fn create_message_in_conversation(&self, message: Message) -> Result<Message, StoreError> {
        sqlx::query_as(
            "INSERT INTO messages (id, conversation_id, kind, created_at, text) VALUES (?, ?, ?, ?, ?) RETURNING id, conversation_id, kind, created_at, text",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.kind)
        .bind(message.created_at)
        .bind(message.text)
        .fetch_one(&**self.connection)
        .await
        .map_err(log_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT id FROM conversations LIMIT 1")
            .fetch_optional(&**self.connection)
            .await
            .map(|_| ())
            .map_err(log_error)
    }
}

#[injectable(UserRepository)]
pub struct DbUserRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&**self.connection)
        .await
        .map_err(log_error)
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        sqlx::query_as(
            "INSERT INTO users (id, name, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?) RETURNING id, name, email, password_hash, created_at",
        )
        .bind(user.id)
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.created_at)
        .fetch_one(&**self.connection)
        .await
        .map_err(log_error)
    }
}

/// Stand-in for both repositories when no database is configured.
pub struct UnconfiguredStore;

#[async_trait]
impl ConversationRepository for UnconfiguredStore {
    async fn list_conversations(&self, _user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn create_conversation(
        &self,
        _conversation: Conversation,
    ) -> Result<Conversation, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn list_conversation_messages(
        &self,
        _conversation_id: Uuid,
    ) -> Result<Vec<Message>, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn create_message_in_conversation(
        &self,
        _message: Message,
    ) -> Result<Message, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::NotConfigured)
    }
}

#[async_trait]
impl UserRepository for UnconfiguredStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn create_user(&self, _user: User) -> Result<User, StoreError> {
        Err(StoreError::NotConfigured)
    }
}
