//! External autocomplete plugins.
//!
//! Plugins map a free-text query to `{label, value}` suggestion pairs for a
//! given item type. The registry is static; the Goodreads plugin is wired up
//! but its scraper is not implemented and always yields no suggestions.

use serde::Serialize;

use crate::error::{ServerError, ServerResult};

/// A single autocomplete suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    /// Display label.
    pub label: String,
    /// Value submitted when the suggestion is picked.
    pub value: String,
}

/// Known plugin names.
const PLUGINS: &[&str] = &["goodreads"];

/// Runs a plugin query. Unknown plugins are an invalid request.
pub fn query(plugin: &str, _query: &str) -> ServerResult<Vec<Suggestion>> {
    match plugin {
        "goodreads" => Ok(goodreads_query(_query)),
        _ => Err(ServerError::InvalidRequest(format!(
            "Unknown plugin '{}'; known plugins: {}",
            plugin,
            PLUGINS.join(", ")
        ))),
    }
}

// TODO: implement the Goodreads search scrape; the upstream page needs an
// HTML parse that has not been written yet.
fn goodreads_query(_query: &str) -> Vec<Suggestion> {
    Vec::new()
}
