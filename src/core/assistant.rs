//! Chat turns and prompt assembly.
//!

use crate::infrastructure::entities;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> ChatMessage {
        ChatMessage::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> ChatMessage {
        ChatMessage::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> ChatMessage {
        ChatMessage::new(Role::Assistant, content)
    }
}

impl From<entities::Message> for ChatMessage {
    fn from(m: entities::Message) -> Self {
        Self {
            content: m.text,
            role: m.kind.into(),
        }
    }
}

impl From<entities::MessageKind> for Role {
    fn from(kind: entities::MessageKind) -> Self {
        match kind {
            entities::MessageKind::System => Role::System,
            entities::MessageKind::User => Role::User,
            entities::MessageKind::Assistant => Role::Assistant,
        }
    }
}

impl From<Role> for entities::MessageKind {
    fn from(role: Role) -> Self {
        match role {
            Role::System => entities::MessageKind::System,
            Role::User => entities::MessageKind::User,
            Role::Assistant => entities::MessageKind::Assistant,
        }
    }
}

/// A validated chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub user_id: Option<String>,
    pub conversation_id: Option<Uuid>,
}

/// The outgoing message list: one system message, then the caller's turns in order.
pub fn build_prompt(system_prompt: &str, messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut prompt = Vec::with_capacity(messages.len() + 1);
    prompt.push(ChatMessage::system(system_prompt));
    prompt.extend_from_slice(messages);
    prompt
}

pub fn latest_user_message(messages: &[ChatMessage]) -> Option<&ChatMessage> {
    messages.iter().rev().find(|m| m.role == Role::User)
}
