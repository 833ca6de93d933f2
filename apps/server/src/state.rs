//! Shared application state.

use auth::SessionStore;
use catalog_store::CatalogStore;

use crate::config::Config;

/// Shared application state passed to all handlers.
pub struct AppState<S: CatalogStore> {
    /// Server configuration.
    pub config: Config,
    /// Catalog store backend.
    pub store: S,
    /// Session store backend.
    pub sessions: Box<dyn SessionStore>,
}

impl<S: CatalogStore> AppState<S> {
    /// Creates new application state.
    pub fn new(config: Config, store: S, sessions: Box<dyn SessionStore>) -> Self {
        Self { config, store, sessions }
    }
}
