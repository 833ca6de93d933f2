//! Item API endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use catalog_store::{CatalogStore, ItemFilter, Ordering, StoreError};
use entities::{identity_key, Item};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ServerError, ServerResult};
use crate::middleware::CurrentUser;
use crate::services::{naming, validation::validate_against_schema};
use crate::state::AppState;

/// Compact item representation for list views.
#[derive(Debug, Serialize)]
pub struct ItemListEntry {
    /// Token.
    pub token: String,
    /// Rendered display name.
    pub name: String,
    /// Rating, if any.
    pub rating: Option<f64>,
    /// Owning type's slug.
    pub item_type: String,
    /// Absolute icon URL, if an icon was uploaded.
    pub icon_url: Option<String>,
}

/// Full item representation.
#[derive(Debug, Serialize)]
pub struct ItemDetail {
    /// Token.
    pub token: String,
    /// Rendered display name.
    pub name: String,
    /// Owning type's slug.
    pub item_type: String,
    /// Schema-constrained payload.
    pub info: Map<String, Value>,
    /// Rating, if any.
    pub rating: Option<f64>,
    /// Free-text notes.
    pub notes: String,
    /// Pinned flag.
    pub pinned: bool,
    /// Parent item token, if any.
    pub parent: Option<String>,
    /// Absolute icon URL, if an icon was uploaded.
    pub icon_url: Option<String>,
}

/// Item list query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListItemsQuery {
    /// Filter by type slug.
    #[serde(default)]
    pub item_type: Option<String>,
    /// Filter by pinned flag.
    #[serde(default)]
    pub pinned: Option<bool>,
    /// Case-insensitive substring match over rendered names.
    #[serde(default)]
    pub search: Option<String>,
    /// Sort order: `created`, `-created`, `modified`, `-modified`.
    #[serde(default)]
    pub ordering: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Partial item update body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    /// Replacement `info` payload, validated against the type's schema.
    #[serde(default)]
    pub info: Option<Map<String, Value>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub pinned: Option<bool>,
    /// Double option: absent leaves the parent alone, `null` detaches it.
    #[serde(default, deserialize_with = "super::double_option")]
    pub parent: Option<Option<String>>,
}

fn parse_ordering(raw: &Option<String>) -> ServerResult<Ordering> {
    match raw {
        None => Ok(Ordering::default()),
        Some(s) => Ordering::parse(s)
            .ok_or_else(|| ServerError::InvalidRequest(format!("Unknown ordering '{}'", s))),
    }
}

async fn require_item<S: CatalogStore>(
    state: &AppState<S>,
    user_token: &str,
    token: &str,
) -> ServerResult<Item> {
    state
        .store
        .get_item(user_token, token)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Item {} not found", token)))
}

async fn to_detail<S: CatalogStore>(
    state: &AppState<S>,
    item: &Item,
) -> ServerResult<ItemDetail> {
    let name = naming::display_name(&state.store, item).await?;
    Ok(ItemDetail {
        token: item.token.clone(),
        name,
        item_type: item.item_type_slug.clone(),
        info: item.info.clone(),
        rating: item.rating,
        notes: item.notes.clone(),
        pinned: item.pinned,
        parent: item.parent_token.clone(),
        icon_url: item.icon_path.as_ref().map(|p| state.config.media_url(p)),
    })
}

/// Lists the current user's items with filtering, name search and paging.
///
/// Name search happens after rendering, so the filtered set is loaded
/// unpaginated and paged in memory when `search` is present.
pub async fn list_items<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListItemsQuery>,
) -> ServerResult<Json<Vec<ItemListEntry>>> {
    let ordering = parse_ordering(&query.ordering)?;
    let searching = query.search.is_some();
    let filter = ItemFilter {
        item_type_slug: query.item_type.clone(),
        pinned: query.pinned,
        ordering,
        limit: if searching { None } else { query.limit },
        offset: if searching { None } else { query.offset },
    };

    let items = state.store.list_items(&user.token, &filter).await?;

    // Name templates are per type; fetch each type once.
    let mut templates: HashMap<String, String> = HashMap::new();
    for item_type in state.store.list_item_types(&user.token).await? {
        templates.insert(item_type.slug.clone(), item_type.name_schema);
    }

    let mut entries = Vec::with_capacity(items.len());
    for item in &items {
        let template = templates.get(&item.item_type_slug).cloned().unwrap_or_default();
        let name = naming::render_with_chain(&state.store, item, &template).await?;
        entries.push(ItemListEntry {
            token: item.token.clone(),
            name,
            rating: item.rating,
            item_type: item.item_type_slug.clone(),
            icon_url: item.icon_path.as_ref().map(|p| state.config.media_url(p)),
        });
    }

    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        entries.retain(|e| e.name.to_lowercase().contains(&needle));
        let offset = query.offset.unwrap_or(0) as usize;
        let entries: Vec<_> = entries
            .into_iter()
            .skip(offset)
            .take(query.limit.map(|l| l as usize).unwrap_or(usize::MAX))
            .collect();
        return Ok(Json(entries));
    }

    Ok(Json(entries))
}

/// Returns one item by token.
pub async fn get_item<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
) -> ServerResult<Json<ItemDetail>> {
    let item = require_item(&state, &user.token, &token).await?;
    Ok(Json(to_detail(&state, &item).await?))
}

/// Applies a partial update to an item.
///
/// Changing `info` re-validates it against the type's schema and re-derives
/// the identity key; colliding with another item is a conflict.
pub async fn update_item<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> ServerResult<Json<ItemDetail>> {
    let mut item = require_item(&state, &user.token, &token).await?;

    if let Some(info) = request.info {
        let item_type = state
            .store
            .get_item_type(&user.token, &item.item_type_slug)
            .await?
            .ok_or_else(|| {
                ServerError::NotFound(format!("Item type '{}' not found", item.item_type_slug))
            })?;
        validate_against_schema(&Value::Object(info.clone()), &item_type.item_schema)?;
        item.identity_key = identity_key(&item_type.required_fields(), &info);
        item.info = info;
    }
    if let Some(rating) = request.rating {
        item.rating = Some(rating);
    }
    if let Some(notes) = request.notes {
        item.notes = notes;
    }
    if let Some(pinned) = request.pinned {
        item.pinned = pinned;
    }
    if let Some(parent) = request.parent {
        if let Some(parent_token) = &parent {
            require_item(&state, &user.token, parent_token).await?;
        }
        item.parent_token = parent;
    }
    item.modified = chrono::Utc::now();

    match state.store.update_item(&item).await {
        Ok(()) => {}
        Err(StoreError::IdentityConflict { .. }) => {
            return Err(ServerError::Conflict(
                "Another item of this type already has these values".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(user = %user.token, item = %token, "Item updated");

    Ok(Json(to_detail(&state, &item).await?))
}

/// Deletes an item, detaching children and removing its activities.
pub async fn delete_item<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
) -> ServerResult<StatusCode> {
    require_item(&state, &user.token, &token).await?;
    state.store.delete_item(&user.token, &token).await?;
    tracing::info!(user = %user.token, item = %token, "Item deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Stores an uploaded icon for an item.
pub async fn upload_icon<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
    multipart: Multipart,
) -> ServerResult<Json<ItemDetail>> {
    let mut item = require_item(&state, &user.token, &token).await?;

    let stored = super::save_upload(&state.config.media_dir, &user.token, multipart).await?;
    if let Some(old) = item.icon_path.replace(stored) {
        super::remove_media(&state.config.media_dir, &old).await;
    }
    item.modified = chrono::Utc::now();
    state.store.update_item(&item).await?;

    Ok(Json(to_detail(&state, &item).await?))
}

/// Removes an item's icon.
pub async fn delete_icon<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
) -> ServerResult<StatusCode> {
    let mut item = require_item(&state, &user.token, &token).await?;
    if let Some(old) = item.icon_path.take() {
        super::remove_media(&state.config.media_dir, &old).await;
    }
    item.modified = chrono::Utc::now();
    state.store.update_item(&item).await?;
    Ok(StatusCode::NO_CONTENT)
}
