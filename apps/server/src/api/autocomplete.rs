//! Autocomplete and UI filter endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use catalog_store::{CatalogStore, ItemFilter};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{ServerError, ServerResult};
use crate::middleware::CurrentUser;
use crate::services::{naming, plugins};
use crate::state::AppState;

/// Plugin autocomplete query parameters.
#[derive(Debug, Deserialize)]
pub struct PluginQuery {
    /// Plugin name.
    pub plugin: String,
    /// Free-text query.
    #[serde(default)]
    pub query: String,
}

fn choice(label: Value, value: Value) -> Value {
    json!({ "label": label, "value": value })
}

/// Per-field value suggestions for an item type's form.
///
/// Each schema property maps to the distinct values stored for it across the
/// user's items of that type. A type with a parent additionally offers the
/// parent-type items keyed by the parent slug, with tokens as values.
pub async fn get_autocomplete_suggestions<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> ServerResult<Json<Value>> {
    let item_type = state
        .store
        .get_item_type(&user.token, &slug)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Item type '{}' not found", slug)))?;

    let mut choices = Map::new();

    let properties: Vec<String> = item_type
        .item_schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default();
    for field in properties {
        let values = state
            .store
            .distinct_info_values(&user.token, &slug, &field)
            .await?;
        let entries: Vec<Value> = values
            .into_iter()
            .map(|v| choice(v.clone(), v))
            .collect();
        choices.insert(field, Value::Array(entries));
    }

    if let Some(parent_slug) = &item_type.parent_slug {
        let filter = ItemFilter {
            item_type_slug: Some(parent_slug.clone()),
            ..Default::default()
        };
        let parents = state.store.list_items(&user.token, &filter).await?;
        let mut entries = Vec::with_capacity(parents.len());
        for parent in &parents {
            let name = naming::display_name(&state.store, parent).await?;
            entries.push(choice(json!(name), json!(parent.token)));
        }
        choices.insert(parent_slug.clone(), Value::Array(entries));
    }

    Ok(Json(Value::Object(choices)))
}

/// Label/value lists backing the item list's filter widgets.
pub async fn items_static_filters<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ServerResult<Json<Value>> {
    let item_types = state.store.list_item_types(&user.token).await?;
    let entries: Vec<Value> = item_types
        .iter()
        .map(|t| choice(json!(t.name), json!(t.slug)))
        .collect();
    Ok(Json(json!({ "itemTypes": entries })))
}

/// Label/value lists backing the activity list's filter widgets.
pub async fn activities_static_filters<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ServerResult<Json<Value>> {
    let item_types = state.store.list_item_types(&user.token).await?;
    let type_entries: Vec<Value> = item_types
        .iter()
        .map(|t| choice(json!(t.name), json!(t.slug)))
        .collect();

    let items = state
        .store
        .list_items(&user.token, &ItemFilter::default())
        .await?;
    let mut item_entries = Vec::with_capacity(items.len());
    for item in &items {
        let name = naming::display_name(&state.store, item).await?;
        item_entries.push(choice(json!(name), json!(item.token)));
    }

    Ok(Json(json!({ "itemTypes": type_entries, "items": item_entries })))
}

/// Runs an external autocomplete plugin for an item type.
pub async fn plugin_autocomplete<S: CatalogStore>(
    State(_state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(_user)): Extension<CurrentUser>,
    Path(_slug): Path<String>,
    Query(query): Query<PluginQuery>,
) -> ServerResult<Json<Value>> {
    let suggestions = plugins::query(&query.plugin, &query.query)?;
    Ok(Json(json!({ "data": suggestions })))
}
