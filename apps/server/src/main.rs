//! Trove Server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use auth::SqliteSessionStore;
use catalog_store::SqliteCatalogStore;
use trove_server::{config::Config, create_app, init_tracing, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    tracing::info!(database_url = %config.database_url, "Starting Trove Server");

    // Connect the catalog store and create the schema if needed
    let store = SqliteCatalogStore::connect(&config.database_url).await?;

    // Sessions share the catalog pool
    let sessions = SqliteSessionStore::new(store.pool().clone());
    sessions.init().await?;

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), store, Box::new(sessions)));

    // Create application router
    let app = create_app(state);

    // Parse server address
    let addr: SocketAddr = config.server_addr().parse()?;

    tracing::info!(addr = %addr, "Server listening");

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
