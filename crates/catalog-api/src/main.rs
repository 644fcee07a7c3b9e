//! Product catalog API server entry point.

use std::sync::Arc;

use catalog_api::app::{build_dispatcher, build_router};
use catalog_api::config::AppConfig;
use catalog_api::error::AppError;
use catalog_api::state::AppState;
use catalog_core::clock::SystemClock;
use catalog_core::store::SharedStore;
use catalog_messaging::broker::InProcessBroker;
use catalog_messaging::consumer::spawn_entity_event_consumer;
use catalog_messaging::handler::LoggingEntityEventHandler;
use catalog_products::application::services::ProductServices;
use catalog_store::in_memory::InMemoryEntityStore;
use catalog_store::pg_entity_store::PgEntityStore;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting product catalog API server");

    let config = AppConfig::from_env()?;
    let store = open_store(&config).await?;

    let shutdown = CancellationToken::new();
    let broker = Arc::new(InProcessBroker::new());
    let consumer = spawn_entity_event_consumer(
        &broker,
        &config.entity_events_queue,
        Arc::new(LoggingEntityEventHandler),
        shutdown.clone(),
    )?;

    let services = ProductServices::new(store, broker, Arc::new(SystemClock));
    let dispatcher = build_dispatcher(&services)?;
    let app = build_router(AppState::new(Arc::new(dispatcher), shutdown.clone()));

    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    match consumer.await {
        Ok(handled) => info!(handled, "entity event consumer drained"),
        Err(err) => error!(error = %err, "entity event consumer task failed"),
    }

    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<SharedStore, AppError> {
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set; using the in-memory store, data will not survive a restart");
        return Ok(Arc::new(InMemoryEntityStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
    let store = PgEntityStore::new(pool);
    store.ensure_schema().await?;
    info!("connected to PostgreSQL entity store");
    Ok(Arc::new(store))
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    shutdown.cancel();
}
