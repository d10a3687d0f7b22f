//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no database is configured")]
    NotConfigured,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Conversations of a user, newest first.
    async fn list_conversations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<entities::Conversation>, StoreError>;

    async fn create_conversation(
        &self,
        conversation: entities::Conversation,
    ) -> Result<entities::Conversation, StoreError>;

    /// Messages of a conversation, oldest first.
    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<entities::Message>, StoreError>;

    async fn create_message_in_conversation(
        &self,
        message: entities::Message,
    ) -> Result<entities::Message, StoreError>;

    /// Cheapest possible read, used for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<entities::User>, StoreError>;

    async fn create_user(&self, user: entities::User) -> Result<entities::User, StoreError>;
}
