//! Implementations for the service the app needs.
//!

use crate::config::AppConfig;
use crate::core::assistant::{ChatRequest, build_prompt, latest_user_message};
use crate::core::persistence::{PersistQueue, PersistTask};
use crate::core::traits::{
    AccountError, AccountService, ChatService, CompletionError, CompletionProvider,
    ConversationService, RegisteredUser, Registration,
};
use crate::infrastructure::entities::{Conversation, Message, User};
use crate::infrastructure::traits::{ConversationRepository, StoreError, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{debug, info};
use uuid::Uuid;

pub const DEFAULT_CONVERSATION_TITLE: &str = "Neue Unterhaltung";
pub const PASSWORD_HASH_COST: u32 = 10;

#[injectable(ChatService)]
pub struct DefaultChatService {
    completions: Ref<dyn CompletionProvider>,
    config: Ref<AppConfig>,
    persistence: Ref<PersistQueue>,
}

#[async_trait]
impl ChatService for DefaultChatService {
    async fn reply(&self, request: ChatRequest) -> Result<String, CompletionError> {
        let prompt = build_prompt(&self.config.system_prompt, &request.messages);

        debug!(
            "requesting completion with {} messages (user {:?})",
            prompt.len(),
            request.user_id
        );

        let content = self
            .completions
            .complete(&self.config.model, &prompt)
            .await?
            .unwrap_or_default();

        if let Some(conversation_id) = request.conversation_id {
            self.persistence.submit(PersistTask {
                conversation_id,
                user_message: latest_user_message(&request.messages).map(|m| m.content.clone()),
                assistant_message: content.clone(),
            });
        }

        Ok(content)
    }
}

#[injectable(ConversationService)]
pub struct DefaultConversationService {
    repo: Ref<dyn ConversationRepository>,
}

#[async_trait]
impl ConversationService for DefaultConversationService {
    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        self.repo.list_conversations(user_id).await
    }

    async fn create_conversation(&self, user_id: Uuid) -> Result<Conversation, StoreError> {
        let conversation = self
            .repo
            .create_conversation(Conversation {
                id: Uuid::new_v4(),
                user: user_id,
                title: DEFAULT_CONVERSATION_TITLE.to_owned(),
                created_at: Utc::now(),
            })
            .await?;

        info!("created conversation {} for user {user_id}", conversation.id);
        Ok(conversation)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError> {
        self.repo.list_conversation_messages(conversation_id).await
    }
}

#[injectable(AccountService)]
pub struct DefaultAccountService {
    users: Ref<dyn UserRepository>,
}

fn required(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl AccountService for DefaultAccountService {
    async fn register(&self, registration: Registration) -> Result<RegisteredUser, AccountError> {
        let (Some(name), Some(email), Some(password)) = (
            required(registration.name),
            required(registration.email).map(|email| email.to_lowercase()),
            // Passwords are taken verbatim, only emptiness is rejected.
            registration.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AccountError::MissingFields);
        };

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let password_hash =
            tokio::task::spawn_blocking(move || bcrypt::hash(password, PASSWORD_HASH_COST))
                .await
                .map_err(|e| AccountError::Hashing(e.to_string()))?
                .map_err(|e| AccountError::Hashing(e.to_string()))?;

        let user = self
            .users
            .create_user(User {
                id: Uuid::new_v4(),
                name,
                email,
                password_hash,
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration of the same email.
                StoreError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
                    AccountError::EmailTaken
                }
                e => AccountError::Store(e),
            })?;

        info!("registered user {}", user.id);

        Ok(RegisteredUser {
            id: user.id,
            name: user.name,
            email: user.email,
        })
    }
}
