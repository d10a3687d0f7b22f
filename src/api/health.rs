//! Liveness and integration status

use crate::config::AppConfig;
use crate::core::persistence::{PersistQueue, PersistenceSnapshot};
use crate::infrastructure::traits::{ConversationRepository, StoreError};
use axum::Json;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use di_axum::Inject;
use log::{debug, warn};
use serde::Serialize;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
    pub openai: bool,
    pub database: bool,
    pub persistence_failures: u64,
    pub persistence_dropped: u64,
}

/// Never fails: an unreachable store is reported in the body with a 503.
pub async fn health(
    Inject(config): Inject<AppConfig>,
    Inject(repository): Inject<dyn ConversationRepository>,
    Inject(persistence): Inject<PersistQueue>,
) -> (StatusCode, Json<Health>) {
    let stats = persistence.stats().snapshot();
    let (status, health) = report(config.store_configured(), stats, repository.ping().await);
    (status, Json(health))
}

fn report(
    store_configured: bool,
    stats: PersistenceSnapshot,
    ping: Result<(), StoreError>,
) -> (StatusCode, Health) {
    let mut health = Health {
        ok: true,
        message: Some("Backend is working"),
        error: None,
        timestamp: Utc::now(),
        // The process does not start without an API key.
        openai: true,
        database: store_configured,
        persistence_failures: stats.failed,
        persistence_dropped: stats.dropped,
    };

    match ping {
        Ok(()) | Err(StoreError::NotConfigured) => {
            debug!("health check - OK");
            (StatusCode::OK, health)
        }
        Err(e) => {
            warn!("health check - database unreachable: {e}");
            health.ok = false;
            health.message = None;
            health.error = Some("Database unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, health)
        }
    }
}
