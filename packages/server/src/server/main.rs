// Main entry point for the moderation API server

use std::sync::Arc;

use anyhow::{Context, Result};
use moderation_core::domains::moderation::automation::AutomationPolicy;
use moderation_core::domains::moderation::store::{MemoryStore, PostgresStore};
use moderation_core::kernel::ServerDeps;
use moderation_core::{server::build_app, Config, StoreBackend};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,moderation_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting moderation API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(backend = ?config.store_backend, "Configuration loaded");

    let mode_change_ttl = chrono::Duration::seconds(config.mode_change_ttl_secs);

    let deps = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;

            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");

            let store = Arc::new(PostgresStore::new(pool));
            ServerDeps::new(
                store.clone(),
                store,
                AutomationPolicy::standard(),
                mode_change_ttl,
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; all state is lost on restart");
            let store = Arc::new(MemoryStore::new());
            ServerDeps::new(
                store.clone(),
                store,
                AutomationPolicy::standard(),
                mode_change_ttl,
            )
        }
    };

    let flag = deps
        .automation
        .flag()
        .await
        .context("Failed to load automation flag")?;
    tracing::info!(mode = %flag.mode, version = flag.version, "Automation flag loaded");

    // Build application
    let app = build_app(deps, &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
