use anyhow::Result;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod acl;
pub mod address;
pub mod config;
pub mod context;
pub mod error;
pub mod health;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod read_state;
pub mod realtime;
pub mod routes;
pub mod store;
pub mod utils;

use config::Config;
use context::AppContext;
use hub::BroadcastHub;
use store::{MemoryMessageStore, MessageStore, PgMessageStore};

pub use realtime::run_realtime_server;
pub use routes::create_router;

/// Builds the message store the configuration asks for: Postgres when a
/// `DATABASE_URL` is present (migrations applied on startup), in-memory
/// otherwise.
pub async fn create_store(config: &Config) -> Result<Arc<dyn MessageStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PgMessageStore::connect(url, &config.db).await?;
            tracing::info!("Connected to database");

            tracing::info!("Applying database migrations...");
            sqlx::migrate!().run(store.pool()).await?;
            tracing::info!("Database migrations applied successfully.");

            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL is not set; using the in-memory store. \
                 Messages will not survive a restart."
            );
            Ok(Arc::new(MemoryMessageStore::new()))
        }
    }
}

pub async fn run_api_server(ctx: Arc<AppContext>, listener: TcpListener) -> Result<()> {
    let router = routes::create_router(ctx);
    axum::serve(listener, router).await?;
    Ok(())
}

pub async fn run() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    let store = create_store(&config).await?;
    let hub = Arc::new(BroadcastHub::new());
    let ctx = AppContext::new(store, hub, config.clone());

    let api_addr = format!("0.0.0.0:{}", config.api_port);
    let api_listener = TcpListener::bind(&api_addr).await?;
    tracing::info!("REST gateway listening on http://{}", api_addr);

    let realtime_addr = format!("0.0.0.0:{}", config.realtime_port);
    let realtime_listener = TcpListener::bind(&realtime_addr).await?;
    tracing::info!("Realtime hub listening on {} (WebSocket)", realtime_addr);

    let api_server = run_api_server(Arc::new(ctx.clone()), api_listener);
    let realtime_server = realtime::run_realtime_server(ctx, realtime_listener);

    tokio::select! {
        res = api_server => {
            if let Err(e) = res {
                tracing::error!("API server failed: {}", e);
            }
        },
        _ = realtime_server => {
            tracing::info!("Realtime server shut down.");
        },
        _ = signal::ctrl_c() => {
            tracing::info!("Shutdown signal received. Shutting down...");
        }
    }

    Ok(())
}
