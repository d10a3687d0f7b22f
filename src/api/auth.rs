//! Local account registration

use crate::api::error::ApiError;
use crate::core::traits::{AccountService, Registration};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/register", post(register))
}

async fn register(
    Inject(account_service): Inject<dyn AccountService>,
    payload: Result<Json<schemas::Register>, JsonRejection>,
) -> Result<(StatusCode, Json<schemas::Registered>), ApiError> {
    let Json(register) = payload?;

    let user = account_service
        .register(Registration {
            name: register.name,
            email: register.email,
            password: register.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(schemas::Registered {
            user_id: user.id,
            name: user.name,
            email: user.email,
        }),
    ))
}

pub mod schemas {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize)]
    pub struct Register {
        #[serde(default)]
        pub name: Option<String>,
        #[serde(default)]
        pub email: Option<String>,
        #[serde(default)]
        pub password: Option<String>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Registered {
        pub user_id: Uuid,
        pub name: String,
        pub email: String,
    }
}
