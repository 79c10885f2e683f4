use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use slotbook::config::AppConfig;
use slotbook::db::SqliteStore;
use slotbook::handlers;
use slotbook::services::identity::IdentityResolver;
use slotbook::services::workflow::BookingWorkflow;
use slotbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is not set, using the default token");
    }

    let store = SqliteStore::open(&config.database_url, &config.migrations_dir)?;
    tracing::info!(database = %config.database_url, "database ready");

    let identities = IdentityResolver::from_config(&config).context("invalid credential settings")?;

    let state = Arc::new(AppState {
        workflow: BookingWorkflow::new(Arc::new(store), identities),
        config: config.clone(),
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
