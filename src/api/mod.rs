use crate::api::error::ApiError;
use axum::Router;
use axum::routing::{get, post};

pub mod auth;
pub mod chat;
pub mod conversations;
pub mod error;
pub mod health;

/// All endpoints, to be nested under `/api`.
pub fn router() -> Router {
    Router::new()
        .route("/db/health", get(health::health))
        .route("/chat", post(chat::chat))
        .nest("/auth", auth::router())
        .nest("/conversations", conversations::router())
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
