//! Trove Server
//!
//! A personal cataloguing and tracking backend: users define item types with
//! JSON-Schema-validated payloads, create items of those types, and log
//! activities against them. Items are deduplicated by the values of their
//! schema-required fields and display names are rendered from per-type
//! templates.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use catalog_store::CatalogStore;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the application router with all routes configured.
pub fn create_app<S: CatalogStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let media_dir = state.config.media_dir.clone();

    Router::new()
        .merge(
            api::protected_router()
                .layer(from_fn_with_state(state.clone(), middleware::require_session::<S>)),
        )
        .merge(api::public_router())
        .nest_service("/media", ServeDir::new(media_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
