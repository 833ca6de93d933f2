//! User settings API endpoints.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use catalog_store::CatalogStore;
use entities::UserSettings;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{ServerError, ServerResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Settings update body; the map is merged key-by-key onto the stored
/// settings so clients can send only what changed.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// Settings keys to replace.
    pub settings: Map<String, Value>,
}

/// Returns the current user's settings map.
pub async fn get_settings(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<Value> {
    Json(json!({ "settings": user.settings }))
}

/// Merges the provided keys into the current user's settings.
pub async fn update_settings<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ServerResult<Json<Value>> {
    let mut merged = match serde_json::to_value(&user.settings) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (key, value) in request.settings {
        merged.insert(key, value);
    }

    let settings: UserSettings = serde_json::from_value(Value::Object(merged))
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid settings: {}", e)))?;

    state.store.update_user_settings(&user.token, &settings).await?;

    Ok(Json(json!({ "settings": settings })))
}
