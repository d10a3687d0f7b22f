//! Conversations endpoints

use crate::api::conversations::schemas::{
    ConversationCreated, ConversationList, CreateConversation, MessagesList,
};
use crate::api::error::ApiError;
use crate::core::traits::ConversationService;
use axum::extract::Path;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    // `:id` is a user id on the list route and a conversation id on `/messages`.
    Router::new()
        .route("/", post(new_conversation))
        .route("/:id", get(list_conversations))
        .route("/:id/messages", get(conversation_messages))
}

async fn new_conversation(
    Inject(conversation_service): Inject<dyn ConversationService>,
    payload: Result<Json<CreateConversation>, JsonRejection>,
) -> Result<Json<ConversationCreated>, ApiError> {
    let Json(create_conversation) = payload?;
    let user_id = create_conversation
        .user_id
        .ok_or_else(|| ApiError::BadRequest("userId required".to_owned()))?;

    let conversation = conversation_service.create_conversation(user_id).await?;

    Ok(Json(ConversationCreated {
        conversation_id: conversation.id,
    }))
}

async fn list_conversations(
    Inject(conversation_service): Inject<dyn ConversationService>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ConversationList>, ApiError> {
    let Path(user_id) = user_id?;
    let conversations = conversation_service.list_conversations(user_id).await?;

    Ok(Json(ConversationList {
        conversations: conversations
            .into_iter()
            .map(schemas::Conversation::from)
            .collect(),
    }))
}

async fn conversation_messages(
    Inject(conversation_service): Inject<dyn ConversationService>,
    conversation_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessagesList>, ApiError> {
    let Path(conversation_id) = conversation_id?;
    let messages = conversation_service.list_messages(conversation_id).await?;

    Ok(Json(MessagesList {
        messages: messages.into_iter().map(schemas::Message::from).collect(),
    }))
}

pub mod schemas {
    use crate::core::assistant::Role;
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateConversation {
        #[serde(default)]
        pub user_id: Option<Uuid>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct ConversationCreated {
        pub conversation_id: Uuid,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Conversation {
        pub id: Uuid,
        pub user_id: Uuid,
        pub title: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Conversation> for Conversation {
        fn from(conversation: entities::Conversation) -> Self {
            Conversation {
                id: conversation.id,
                user_id: conversation.user,
                title: conversation.title,
                created_at: conversation.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationList {
        pub conversations: Vec<Conversation>,
    }

    #[derive(Serialize, Debug, Default)]
    pub struct MessagesList {
        pub messages: Vec<Message>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Message {
        pub id: Uuid,
        pub conversation_id: Uuid,
        pub role: Role,
        pub content: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Message> for Message {
        fn from(message: entities::Message) -> Self {
            Message {
                id: message.id,
                conversation_id: message.conversation_id,
                role: message.kind.into(),
                content: message.text,
                created_at: message.created_at,
            }
        }
    }
}
