//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use di::Ref;
use homeopath_chat_api::config::AppConfig;
use homeopath_chat_api::core::assistant::ChatMessage;
use homeopath_chat_api::core::persistence::{PersistenceSnapshot, PersistenceStats};
use homeopath_chat_api::core::traits::{CompletionError, CompletionProvider};
use homeopath_chat_api::infrastructure::database::DatabaseConnection;
use homeopath_chat_api::{Services, app, compose};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const TEST_SYSTEM_PROMPT: &str = "Du bist ein digitaler Homöopath (Test).";
pub const TEST_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub enum Behaviour {
    Reply(Option<String>),
    FailWithStatus(u16),
    Timeout,
}

/// Completion provider double that records every call.
pub struct FakeCompletion {
    behaviour: Behaviour,
    calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl FakeCompletion {
    pub fn new(behaviour: Behaviour) -> FakeCompletion {
        FakeCompletion {
            behaviour,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(content: &str) -> FakeCompletion {
        Self::new(Behaviour::Reply(Some(content.to_owned())))
    }

    pub fn calls(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, CompletionError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_owned(), messages.to_vec()));

        match &self.behaviour {
            Behaviour::Reply(content) => Ok(content.clone()),
            Behaviour::FailWithStatus(status) => Err(CompletionError::Status {
                status: *status,
                body: "upstream exploded".to_owned(),
            }),
            Behaviour::Timeout => Err(CompletionError::Timeout),
        }
    }
}

pub fn test_config(with_database: bool) -> AppConfig {
    AppConfig::from_lookup(|name| match name {
        "OPENAI_API_KEY" => Some("sk-test-key".to_owned()),
        "SYSTEM_PROMPT" => Some(TEST_SYSTEM_PROMPT.to_owned()),
        "DATABASE_URL" if with_database => Some("sqlite::memory:".to_owned()),
        _ => None,
    })
    .unwrap()
}

/// Fresh in-memory database with migrations applied.
pub async fn setup_test_db() -> DatabaseConnection {
    DatabaseConnection::connect("sqlite::memory:").await.unwrap()
}

pub struct TestApp {
    pub router: axum::Router,
    pub completions: Arc<FakeCompletion>,
    pub stats: Arc<PersistenceStats>,
    pub db: Option<DatabaseConnection>,
}

pub async fn spawn_app(completions: FakeCompletion, with_database: bool) -> TestApp {
    let db = if with_database {
        Some(setup_test_db().await)
    } else {
        None
    };
    spawn_app_with_db(completions, db)
}

pub fn spawn_app_with_db(completions: FakeCompletion, db: Option<DatabaseConnection>) -> TestApp {
    let completions = Arc::new(completions);
    let config = test_config(db.is_some());

    let Services {
        provider,
        persistence_stats,
        ..
    } = compose(
        config,
        completions.clone() as Ref<dyn CompletionProvider>,
        db.clone(),
    )
    .unwrap();

    TestApp {
        router: app(provider, &[]),
        completions,
        stats: persistence_stats,
        db,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    /// Waits until the persistence task has settled `records` records.
    pub async fn wait_for_records(&self, records: u64) -> PersistenceSnapshot {
        let stats = self.stats.clone();
        tokio::time::timeout(Duration::from_secs(5), async move {
            loop {
                let snapshot = stats.snapshot();
                let settled =
                    snapshot.written + snapshot.failed + snapshot.dropped + snapshot.skipped;
                if settled >= records {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("persistence task did not settle in time")
    }

    pub async fn count(&self, sql: &str) -> i64 {
        let db = self.db.as_ref().expect("test app has no database");
        let (count,): (i64,) = sqlx::query_as(sql).fetch_one(&**db).await.unwrap();
        count
    }
}
