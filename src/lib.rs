//! Chat proxy backend for the digital homeopath assistant - Library exports for testing
//!

pub mod api;
pub mod config;
pub mod core;
pub mod infrastructure;

use crate::config::AppConfig;
use crate::core::persistence::{self, PERSIST_QUEUE_CAPACITY, PersistQueue, PersistenceStats};
use crate::core::services::{DefaultAccountService, DefaultChatService, DefaultConversationService};
use crate::core::traits::CompletionProvider;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::repositories::{
    DbConversationRepository, DbUserRepository, UnconfiguredStore,
};
use crate::infrastructure::traits::{ConversationRepository, UserRepository};
use anyhow::anyhow;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use di::{Injectable, Ref, ServiceCollection, ServiceProvider, existing_as_self, singleton_factory};
use di_axum::RouterServiceProviderExtensions;
use log::warn;
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as CorsAny, CorsLayer};
use tower_http::trace::TraceLayer;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Everything a running server needs, wired together.
pub struct Services {
    pub provider: ServiceProvider,
    pub persistence_task: JoinHandle<()>,
    pub persistence_stats: Arc<PersistenceStats>,
}

/// Registers the collaborators and starts the persistence task.
///
/// Without a database every store-backed call answers `NotConfigured`.
/// Must be called from within a Tokio runtime.
pub fn compose(
    config: AppConfig,
    completions: Ref<dyn CompletionProvider>,
    database: Option<DatabaseConnection>,
) -> anyhow::Result<Services> {
    let (queue, receiver) = PersistQueue::new(PERSIST_QUEUE_CAPACITY);
    let persistence_stats = queue.stats();

    let mut services = ServiceCollection::new();
    services
        .add(existing_as_self(config))
        .add(existing_as_self(queue))
        .add(singleton_factory::<dyn CompletionProvider, _>(
            move |_| completions.clone(),
        ))
        .add(DefaultChatService::scoped())
        .add(DefaultConversationService::scoped())
        .add(DefaultAccountService::scoped());

    match database {
        Some(database) => {
            services
                .add(existing_as_self(database))
                .add(DbConversationRepository::singleton())
                .add(DbUserRepository::singleton());
        }
        None => {
            services
                .add(singleton_factory::<dyn ConversationRepository, _>(
                    |_| -> Ref<dyn ConversationRepository> { Ref::new(UnconfiguredStore) },
                ))
                .add(singleton_factory::<dyn UserRepository, _>(
                    |_| -> Ref<dyn UserRepository> { Ref::new(UnconfiguredStore) },
                ));
        }
    }

    let provider = services
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))?;

    let persistence_task = tokio::spawn(persistence::background_task(
        receiver,
        provider.get_required::<dyn ConversationRepository>(),
        persistence_stats.clone(),
    ));

    Ok(Services {
        provider,
        persistence_task,
        persistence_stats,
    })
}

/// The HTTP application: `/api` routes plus the global layers.
pub fn app(provider: ServiceProvider, cors_origins: &[String]) -> Router {
    let routes = Router::new()
        .nest("/api", api::router())
        .fallback(api::not_found);

    with_layers(routes, cors_origins).with_provider(provider)
}

/// Body limit, panic handler, tracing and CORS.
///
/// A panicking handler answers a generic 500, the panic payload is never sent.
pub fn with_layers(router: Router, cors_origins: &[String]) -> Router {
    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_headers(CorsAny)
        .allow_methods([Method::GET, Method::POST]);

    if origins.is_empty() {
        return layer.allow_origin(CorsAny);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

fn handle_panic(_: Box<dyn Any + Send + 'static>) -> Response {
    api::error::ApiError::Internal("request handler panicked".to_owned()).into_response()
}
