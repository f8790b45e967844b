use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod gateway;
pub mod repository;
pub mod service;

use crate::config::Config;
use crate::gateway::ChannelGateway;
use crate::repository::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conveyor_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Conveyor Orchestrator...");

    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(database_url, config.db_max_connections)
                .await
                .expect("Failed to create database pool");

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; nothing will persist");
            Arc::new(MemoryStore::new())
        }
    };

    // No transport attaches targets to the gateway yet, so every command
    // resolves as offline.
    let gateway = Arc::new(ChannelGateway::new(config.mailbox_capacity));

    let state = api::AppState::new(store, gateway, config.restart_ack_timeout);

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
