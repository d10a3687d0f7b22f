//! HTTP error mapping.
//!
//! Client errors carry their message back to the caller. Upstream and store
//! failures are logged in full, the response body only gets a generic
//! `error` plus a `details` string that never contains credentials.

use crate::core::traits::{AccountError, CompletionError};
use crate::infrastructure::traits::StoreError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found")]
    NotFound,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Upstream(#[from] CompletionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not found" })),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "error": "Request body too large" }),
            ),
            ApiError::Upstream(CompletionError::Timeout) => {
                error!("chat error: completion request timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    json!({ "error": "Chat request timed out" }),
                )
            }
            ApiError::Upstream(e) => {
                error!("chat error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Chat request failed", "details": e.to_string() }),
                )
            }
            ApiError::Store(StoreError::NotConfigured) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Database not configured" }),
            ),
            ApiError::Store(StoreError::Database(e)) => {
                error!("database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Database request failed" }),
                )
            }
            ApiError::Internal(m) => {
                error!("internal server error: {m}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        let message = e.to_string();
        match e {
            AccountError::MissingFields => ApiError::BadRequest(message),
            AccountError::EmailTaken => ApiError::Conflict(message),
            AccountError::Store(e) => ApiError::Store(e),
            AccountError::Hashing(m) => ApiError::Internal(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(
            render(ApiError::BadRequest("x".into())).await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            render(ApiError::Conflict("x".into())).await.0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            render(ApiError::Upstream(CompletionError::Timeout)).await.0,
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            render(ApiError::Store(StoreError::NotConfigured)).await.0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            render(AccountError::EmailTaken.into()).await.0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            render(AccountError::MissingFields.into()).await.0,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_upstream_status_body_not_echoed() {
        let (status, body) = render(ApiError::Upstream(CompletionError::Status {
            status: 401,
            body: "Incorrect API key provided: sk-abc".to_owned(),
        }))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Chat request failed");
        assert!(!body.to_string().contains("sk-abc"));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = render(ApiError::Internal("secret path /etc/x".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }
}
