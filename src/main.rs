use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use availability_resolver::config::{AppConfig, StoreBackend};
use availability_resolver::db;
use availability_resolver::handlers;
use availability_resolver::services::availability::AvailabilityService;
use availability_resolver::services::store::rest::RestStore;
use availability_resolver::services::store::sqlite::SqliteStore;
use availability_resolver::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let availability = match config.store_backend {
        StoreBackend::Rest => {
            anyhow::ensure!(!config.rest_url.is_empty(), "REST_URL must be set when STORE_BACKEND=rest");
            tracing::info!("using REST store (url: {})", config.rest_url);
            let store = Arc::new(RestStore::new(
                config.rest_url.clone(),
                config.rest_api_key.clone(),
                Duration::from_secs(config.store_timeout_secs),
            )?);
            AvailabilityService::new(store.clone(), store, &config)
        }
        StoreBackend::Sqlite => {
            tracing::info!("using SQLite store (path: {})", config.database_url);
            let conn = db::init_db(&config.database_url)?;
            let store = Arc::new(SqliteStore::new(Arc::new(Mutex::new(conn))));
            AvailabilityService::new(store.clone(), store, &config)
        }
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        availability,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
