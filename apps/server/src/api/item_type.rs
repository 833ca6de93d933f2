//! Item type API endpoints.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use catalog_store::CatalogStore;
use entities::{slugify, ItemType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{ServerError, ServerResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Compact item type representation for list views.
#[derive(Debug, Serialize)]
pub struct ItemTypeListEntry {
    /// Slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Absolute icon URL, if an icon was uploaded.
    pub icon_url: Option<String>,
}

/// Full item type representation.
#[derive(Debug, Serialize)]
pub struct ItemTypeDetail {
    /// Slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// JSON Schema for item `info` payloads.
    pub item_schema: Value,
    /// JSON Schema for activity `info` payloads.
    pub activity_schema: Value,
    /// Display-name template.
    pub name_schema: String,
    /// Per-field external autocomplete configuration.
    pub auto_complete_config: Value,
    /// Parent type slug, if nested.
    pub parent_slug: Option<String>,
    /// Absolute icon URL, if an icon was uploaded.
    pub icon_url: Option<String>,
}

/// Item type creation body.
#[derive(Debug, Deserialize)]
pub struct CreateItemTypeRequest {
    /// Display name; the slug is derived from it.
    pub name: String,
    /// Parent type slug.
    #[serde(rename = "parentSlug", default)]
    pub parent_slug: Option<String>,
}

/// Partial item type update body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemTypeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub item_schema: Option<Value>,
    #[serde(default)]
    pub activity_schema: Option<Value>,
    #[serde(default)]
    pub name_schema: Option<String>,
    #[serde(default)]
    pub auto_complete_config: Option<Value>,
    /// Double option: absent leaves the parent alone, `null` clears it.
    #[serde(
        rename = "parentSlug",
        default,
        deserialize_with = "super::double_option"
    )]
    pub parent_slug: Option<Option<String>>,
}

fn icon_url(config: &Config, icon_path: &Option<String>) -> Option<String> {
    icon_path.as_ref().map(|p| config.media_url(p))
}

fn to_detail(config: &Config, item_type: &ItemType) -> ItemTypeDetail {
    ItemTypeDetail {
        slug: item_type.slug.clone(),
        name: item_type.name.clone(),
        item_schema: item_type.item_schema.clone(),
        activity_schema: item_type.activity_schema.clone(),
        name_schema: item_type.name_schema.clone(),
        auto_complete_config: item_type.auto_complete_config.clone(),
        parent_slug: item_type.parent_slug.clone(),
        icon_url: icon_url(config, &item_type.icon_path),
    }
}

async fn require_item_type<S: CatalogStore>(
    state: &AppState<S>,
    user_token: &str,
    slug: &str,
) -> ServerResult<ItemType> {
    state
        .store
        .get_item_type(user_token, slug)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Item type '{}' not found", slug)))
}

/// Ensures a referenced parent slug names one of the user's types.
async fn check_parent_slug<S: CatalogStore>(
    state: &AppState<S>,
    user_token: &str,
    parent_slug: &str,
) -> ServerResult<()> {
    require_item_type(state, user_token, parent_slug).await.map(|_| ())
}

/// Lists the current user's item types.
pub async fn list_item_types<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ServerResult<Json<Vec<ItemTypeListEntry>>> {
    let item_types = state.store.list_item_types(&user.token).await?;
    Ok(Json(
        item_types
            .iter()
            .map(|t| ItemTypeListEntry {
                slug: t.slug.clone(),
                name: t.name.clone(),
                icon_url: icon_url(&state.config, &t.icon_path),
            })
            .collect(),
    ))
}

/// Creates a new item type from a display name.
pub async fn create_item_type<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CreateItemTypeRequest>,
) -> ServerResult<(StatusCode, Json<ItemTypeDetail>)> {
    let slug = slugify(&request.name);
    if slug.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Name must contain at least one alphanumeric character".to_string(),
        ));
    }

    let mut item_type = ItemType::new(&user.token, slug, request.name);
    if let Some(parent_slug) = request.parent_slug {
        check_parent_slug(&state, &user.token, &parent_slug).await?;
        item_type.parent_slug = Some(parent_slug);
    }

    state.store.create_item_type(&item_type).await?;
    tracing::info!(user = %user.token, slug = %item_type.slug, "Item type created");

    Ok((
        StatusCode::CREATED,
        Json(to_detail(&state.config, &item_type)),
    ))
}

/// Returns one item type by slug.
pub async fn get_item_type<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> ServerResult<Json<ItemTypeDetail>> {
    let item_type = require_item_type(&state, &user.token, &slug).await?;
    Ok(Json(to_detail(&state.config, &item_type)))
}

/// Applies a partial update to an item type.
pub async fn update_item_type<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(slug): Path<String>,
    Json(request): Json<UpdateItemTypeRequest>,
) -> ServerResult<Json<ItemTypeDetail>> {
    let mut item_type = require_item_type(&state, &user.token, &slug).await?;

    if let Some(name) = request.name {
        item_type.name = name;
    }
    if let Some(schema) = request.item_schema {
        item_type.item_schema = schema;
    }
    if let Some(schema) = request.activity_schema {
        item_type.activity_schema = schema;
    }
    if let Some(template) = request.name_schema {
        item_type.name_schema = template;
    }
    if let Some(config) = request.auto_complete_config {
        item_type.auto_complete_config = config;
    }
    if let Some(parent_slug) = request.parent_slug {
        if let Some(parent_slug) = &parent_slug {
            check_parent_slug(&state, &user.token, parent_slug).await?;
        }
        item_type.parent_slug = parent_slug;
    }
    item_type.modified = chrono::Utc::now();

    state.store.update_item_type(&item_type).await?;
    tracing::info!(user = %user.token, slug = %slug, "Item type updated");

    Ok(Json(to_detail(&state.config, &item_type)))
}

/// Deletes an item type along with its items and their activities.
pub async fn delete_item_type<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> ServerResult<StatusCode> {
    require_item_type(&state, &user.token, &slug).await?;
    state.store.delete_item_type(&user.token, &slug).await?;
    tracing::info!(user = %user.token, slug = %slug, "Item type deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Stores an uploaded icon for an item type.
pub async fn upload_icon<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> ServerResult<Json<ItemTypeDetail>> {
    let mut item_type = require_item_type(&state, &user.token, &slug).await?;

    let stored = super::save_upload(&state.config.media_dir, &user.token, multipart).await?;
    if let Some(old) = item_type.icon_path.replace(stored) {
        super::remove_media(&state.config.media_dir, &old).await;
    }
    item_type.modified = chrono::Utc::now();
    state.store.update_item_type(&item_type).await?;

    Ok(Json(to_detail(&state.config, &item_type)))
}

/// Removes an item type's icon.
pub async fn delete_icon<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> ServerResult<StatusCode> {
    let mut item_type = require_item_type(&state, &user.token, &slug).await?;
    if let Some(old) = item_type.icon_path.take() {
        super::remove_media(&state.config.media_dir, &old).await;
    }
    item_type.modified = chrono::Utc::now();
    state.store.update_item_type(&item_type).await?;
    Ok(StatusCode::NO_CONTENT)
}
