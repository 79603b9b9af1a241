//! EduSys Server - School Management Back Office
//!
//! REST API server over the EduSys record store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edusys_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::{Repository, StoreHealth},
    seed,
    services::Services,
    storage::Storage,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    tracing::info!("Starting EduSys Server v{}", env!("CARGO_PKG_VERSION"));

    let storage = Storage::from_config(&config.storage)
        .await
        .context("Failed to open storage backend")?;
    let repository = Repository::new(storage, &config.storage);

    match repository.health().await? {
        StoreHealth::Corrupted => {
            tracing::warn!(key = %config.storage.db_key, "Stored blob is corrupted; it will be replaced on the next write")
        }
        StoreHealth::Empty if config.storage.seed => {
            seed::seed_if_empty(&repository)
                .await
                .context("Failed to seed the store")?;
        }
        health => tracing::info!(?health, "Record store opened"),
    }

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let services = Services::new(repository, &config);
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("edusys_server={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
