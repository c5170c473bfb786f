mod assessment;
mod config;
mod db;
mod errors;
mod extraction;
mod ingest;
mod llm_client;
mod profile;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::profile::memory::InMemoryProfileStore;
use crate::profile::postgres::PgProfileStore;
use crate::profile::store::ProfileStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; invalid values abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerFit API v{}", env!("CARGO_PKG_VERSION"));

    // Profile store: PostgreSQL when configured, otherwise process memory
    let store: Arc<dyn ProfileStore> = match &config.database_url {
        Some(url) => Arc::new(PgProfileStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; profiles are kept in memory and lost on restart");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    // Build app state (fit scorer and extractor chosen from config)
    let state = AppState::new(config.clone(), store)?;

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
