//! Activity API endpoints.
//!
//! Activity creation is the main write path of the system: the request
//! carries both the item fields (`itemDetails`) and the activity fields
//! (`activityDetails`), and the handler resolves or creates the item before
//! recording the activity against it.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use catalog_store::{ActivityFilter, CatalogStore, Ordering};
use chrono::{DateTime, Utc};
use entities::Activity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ServerError, ServerResult};
use crate::middleware::CurrentUser;
use crate::services::{
    activities::{record, ActivityDraft},
    items::{resolve_or_create, ItemDraft},
    naming,
};
use crate::state::AppState;

/// Activity creation body.
#[derive(Debug, Deserialize)]
pub struct CreateActivityRequest {
    /// Fields of the item the activity is logged against.
    #[serde(rename = "itemDetails")]
    pub item_details: ItemDetails,
    /// Fields of the activity itself.
    #[serde(rename = "activityDetails")]
    pub activity_details: ActivityDraft,
}

/// The `itemDetails` envelope: a type slug plus the item draft.
#[derive(Debug, Deserialize)]
pub struct ItemDetails {
    /// Slug of the item's type.
    pub item_type: String,
    /// Item fields.
    #[serde(flatten)]
    pub draft: ItemDraft,
}

/// Compact activity representation for list views.
#[derive(Debug, Serialize)]
pub struct ActivityListEntry {
    pub token: String,
    pub item_type: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub finished: bool,
    pub rating: Option<f64>,
    pub item_name: String,
}

/// Full activity representation.
#[derive(Debug, Serialize)]
pub struct ActivityDetail {
    pub token: String,
    pub item: String,
    pub item_type: String,
    pub item_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub finished: bool,
    pub pending: bool,
    pub rating: Option<f64>,
    pub notes: String,
    pub info: Map<String, Value>,
}

/// Activity list query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListActivitiesQuery {
    /// Filter by item token.
    #[serde(default)]
    pub item: Option<String>,
    /// Filter by the item's type slug.
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub finished: Option<bool>,
    #[serde(default)]
    pub pending: Option<bool>,
    /// Sort order: `created`, `-created`, `modified`, `-modified`.
    #[serde(default)]
    pub ordering: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Partial activity update body. The rating is stored as sent; only
/// creation normalizes against the user's scale.
#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    #[serde(default, deserialize_with = "super::double_option")]
    pub start_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub finished: Option<bool>,
    #[serde(default)]
    pub pending: Option<bool>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub rating: Option<Option<f64>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub info: Option<Map<String, Value>>,
}

async fn require_activity<S: CatalogStore>(
    state: &AppState<S>,
    user_token: &str,
    token: &str,
) -> ServerResult<Activity> {
    state
        .store
        .get_activity(user_token, token)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Activity {} not found", token)))
}

async fn item_context<S: CatalogStore>(
    state: &AppState<S>,
    user_token: &str,
    item_token: &str,
) -> ServerResult<(String, String)> {
    match state.store.get_item(user_token, item_token).await? {
        Some(item) => {
            let name = naming::display_name(&state.store, &item).await?;
            Ok((item.item_type_slug, name))
        }
        // The item was deleted out from under the activity.
        None => Ok((String::new(), String::new())),
    }
}

async fn to_detail<S: CatalogStore>(
    state: &AppState<S>,
    user_token: &str,
    activity: &Activity,
) -> ServerResult<ActivityDetail> {
    let (item_type, item_name) = item_context(state, user_token, &activity.item_token).await?;
    Ok(ActivityDetail {
        token: activity.token.clone(),
        item: activity.item_token.clone(),
        item_type,
        item_name,
        start_time: activity.start_time,
        end_time: activity.end_time,
        finished: activity.finished,
        pending: activity.pending,
        rating: activity.rating,
        notes: activity.notes.clone(),
        info: activity.info.clone(),
    })
}

/// Lists the current user's activities.
pub async fn list_activities<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListActivitiesQuery>,
) -> ServerResult<Json<Vec<ActivityListEntry>>> {
    let ordering = match &query.ordering {
        None => Ordering::default(),
        Some(s) => Ordering::parse(s)
            .ok_or_else(|| ServerError::InvalidRequest(format!("Unknown ordering '{}'", s)))?,
    };
    let filter = ActivityFilter {
        item_token: query.item.clone(),
        item_type_slug: query.item_type.clone(),
        finished: query.finished,
        pending: query.pending,
        ordering,
        limit: query.limit,
        offset: query.offset,
    };

    let activities = state.store.list_activities(&user.token, &filter).await?;
    let mut entries = Vec::with_capacity(activities.len());
    for activity in &activities {
        let (item_type, item_name) = item_context(&state, &user.token, &activity.item_token).await?;
        entries.push(ActivityListEntry {
            token: activity.token.clone(),
            item_type,
            start_time: activity.start_time,
            end_time: activity.end_time,
            finished: activity.finished,
            rating: activity.rating,
            item_name,
        });
    }
    Ok(Json(entries))
}

/// Creates an activity, resolving or creating its item first.
///
/// Item resolution validates the info payload against the type's schema and
/// deduplicates by required-field values; any failure there aborts before
/// anything is recorded.
pub async fn create_activity<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CreateActivityRequest>,
) -> ServerResult<(StatusCode, Json<ActivityDetail>)> {
    let item_type = state
        .store
        .get_item_type(&user.token, &request.item_details.item_type)
        .await?
        .ok_or_else(|| {
            ServerError::NotFound(format!(
                "Item type '{}' not found",
                request.item_details.item_type
            ))
        })?;

    let (item, created) = resolve_or_create(&state.store, &item_type, request.item_details.draft).await?;
    let activity = record(&user, &item, request.activity_details);
    state.store.insert_activity(&activity).await?;

    tracing::info!(
        user = %user.token,
        item = %item.token,
        activity = %activity.token,
        item_created = created,
        "Activity recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(to_detail(&state, &user.token, &activity).await?),
    ))
}

/// Returns one activity by token.
pub async fn get_activity<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
) -> ServerResult<Json<ActivityDetail>> {
    let activity = require_activity(&state, &user.token, &token).await?;
    Ok(Json(to_detail(&state, &user.token, &activity).await?))
}

/// Applies a partial update to an activity.
pub async fn update_activity<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
    Json(request): Json<UpdateActivityRequest>,
) -> ServerResult<Json<ActivityDetail>> {
    let mut activity = require_activity(&state, &user.token, &token).await?;

    if let Some(start_time) = request.start_time {
        activity.start_time = start_time;
    }
    if let Some(end_time) = request.end_time {
        activity.end_time = end_time;
    }
    if let Some(finished) = request.finished {
        activity.finished = finished;
    }
    if let Some(pending) = request.pending {
        activity.pending = pending;
    }
    if let Some(rating) = request.rating {
        activity.rating = rating;
    }
    if let Some(notes) = request.notes {
        activity.notes = notes;
    }
    if let Some(info) = request.info {
        activity.info = info;
    }
    activity.modified = Utc::now();

    state.store.update_activity(&activity).await?;
    tracing::info!(user = %user.token, activity = %token, "Activity updated");

    Ok(Json(to_detail(&state, &user.token, &activity).await?))
}

/// Deletes an activity.
pub async fn delete_activity<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
) -> ServerResult<StatusCode> {
    require_activity(&state, &user.token, &token).await?;
    state.store.delete_activity(&user.token, &token).await?;
    tracing::info!(user = %user.token, activity = %token, "Activity deleted");
    Ok(StatusCode::NO_CONTENT)
}
