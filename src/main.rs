//! Chat proxy backend for the digital homeopath assistant
//!

use homeopath_chat_api::config::AppConfig;
use homeopath_chat_api::infrastructure::database::DatabaseConnection;
use homeopath_chat_api::infrastructure::openai::OpenAiCompletionClient;
use homeopath_chat_api::{Services, app, compose};

use di::Ref;
use log::{error, info, warn};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

const PERSISTENCE_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> anyhow::Result<()> {
    // .env may carry RUST_LOG, load it before the subscriber reads the environment
    dotenvy::dotenv().ok();

    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Missing credentials stop the process before anything is bound.
    let config = AppConfig::from_env().inspect_err(|e| error!("{e}"))?;
    info!("configuration loaded: {config:?}");

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(web_server_task(config))
}

async fn web_server_task(config: AppConfig) -> anyhow::Result<()> {
    let database = match &config.database_url {
        Some(url) => Some(DatabaseConnection::connect(url).await?),
        None => {
            info!("DATABASE_URL not set, conversation storage disabled");
            None
        }
    };

    let completions = Ref::new(OpenAiCompletionClient::from_config(&config)?);
    let port = config.port;
    let cors_origins = config.cors_origins.clone();

    let Services {
        provider,
        persistence_task,
        persistence_stats,
    } = compose(config, completions, database)?;
    let app = app(provider, &cors_origins);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    // The router held the last queue sender, so the persistence task now
    // drains what is left and exits.
    info!("Shutting down, flushing persistence queue...");
    match tokio::time::timeout(PERSISTENCE_DRAIN_TIMEOUT, persistence_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("persistence task failed: {e}"),
        Err(_) => warn!("persistence queue not drained after {PERSISTENCE_DRAIN_TIMEOUT:?}"),
    }
    info!("persistence at shutdown: {:?}", persistence_stats.snapshot());

    Ok(())
}
