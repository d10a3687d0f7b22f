//! Chat endpoint

use crate::api::error::ApiError;
use crate::core::assistant::{ChatMessage, ChatRequest};
use crate::core::traits::ChatService;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use di_axum::Inject;
use log::info;
use serde_json::Value;

pub async fn chat(
    Inject(chat_service): Inject<dyn ChatService>,
    payload: Result<Json<schemas::ChatBody>, JsonRejection>,
) -> Result<Json<schemas::ChatReply>, ApiError> {
    let Json(body) = payload?;
    let request = body.validate()?;

    info!(
        "chat request received ({} messages, conversation {:?})",
        request.messages.len(),
        request.conversation_id
    );

    let content = chat_service.reply(request).await?;

    Ok(Json(schemas::ChatReply { content }))
}

impl schemas::ChatBody {
    /// Only an array of `{role, content}` objects is accepted as `messages`.
    pub fn validate(self) -> Result<ChatRequest, ApiError> {
        let messages = match self.messages {
            Some(messages @ Value::Array(_)) => messages,
            _ => return Err(ApiError::BadRequest("Messages array required".to_owned())),
        };

        let messages: Vec<ChatMessage> = serde_json::from_value(messages)
            .map_err(|e| ApiError::BadRequest(format!("Invalid message: {e}")))?;

        // The caller's user id is an opaque label from the identity provider.
        let user_id = match self.user_id {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id),
            Some(other) => Some(other.to_string()),
        };

        Ok(ChatRequest {
            messages,
            user_id,
            conversation_id: self.conversation_id,
        })
    }
}

pub mod schemas {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct ChatBody {
        #[serde(default)]
        pub messages: Option<Value>,
        #[serde(default)]
        pub user_id: Option<Value>,
        #[serde(default)]
        pub conversation_id: Option<Uuid>,
    }

    #[derive(Serialize, Debug)]
    pub struct ChatReply {
        pub content: String,
    }
}
