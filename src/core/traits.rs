//! DI "Interfaces"

use crate::core::assistant::{ChatMessage, ChatRequest};
use crate::infrastructure::entities;
use crate::infrastructure::traits::StoreError;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Failure of a single completion call. None of the variants carry the credential.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request timed out")]
    Timeout,

    #[error("completion request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("completion API returned status {status}")]
    Status { status: u16, body: String },

    #[error("completion response could not be decoded: {0}")]
    Decode(String),
}

/// Something that turns an ordered, role-tagged message list into a reply.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the text of the first choice, `None` if the reply had no content.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, CompletionError>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Generates the assistant reply for the given turns.
    ///
    /// When the request names a conversation, the exchange is handed to the
    /// persistence task; storage failures never reach the caller.
    async fn reply(&self, request: ChatRequest) -> Result<String, CompletionError>;
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Lists all conversations for the given user, newest first.
    async fn list_conversations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<entities::Conversation>, StoreError>;

    /// Creates a new, empty conversation for the given user.
    async fn create_conversation(&self, user_id: Uuid)
    -> Result<entities::Conversation, StoreError>;

    /// List all messages in a conversation in the order they were written.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<entities::Message>, StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("name, email and password are required")]
    MissingFields,

    #[error("email is already registered")]
    EmailTaken,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Creates a local account.
    ///
    /// Returns `EmailTaken` if the email is already present; nothing is written in that case.
    async fn register(&self, registration: Registration) -> Result<RegisteredUser, AccountError>;
}
