//! API endpoints.

pub mod activity;
pub mod auth;
pub mod autocomplete;
pub mod item;
pub mod item_type;
pub mod user;

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    routing::get,
    Json, Router,
};
use catalog_store::CatalogStore;
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Routes that require a valid session.
pub fn protected_router<S: CatalogStore + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/auth/logout", axum::routing::post(auth::logout))
        .route(
            "/api/item_type",
            get(item_type::list_item_types).post(item_type::create_item_type),
        )
        .route(
            "/api/item_type/{slug}",
            get(item_type::get_item_type)
                .patch(item_type::update_item_type)
                .delete(item_type::delete_item_type),
        )
        .route(
            "/api/item_type/{slug}/icon",
            axum::routing::post(item_type::upload_icon).delete(item_type::delete_icon),
        )
        .route("/api/item", get(item::list_items))
        .route(
            "/api/item/{token}",
            get(item::get_item).patch(item::update_item).delete(item::delete_item),
        )
        .route(
            "/api/item/{token}/icon",
            axum::routing::post(item::upload_icon).delete(item::delete_icon),
        )
        .route(
            "/api/activity",
            get(activity::list_activities).post(activity::create_activity),
        )
        .route(
            "/api/activity/{token}",
            get(activity::get_activity)
                .patch(activity::update_activity)
                .delete(activity::delete_activity),
        )
        .route(
            "/api/settings",
            get(user::get_settings).patch(user::update_settings),
        )
        .route(
            "/api/get_autocomplete_suggestions/{slug}",
            get(autocomplete::get_autocomplete_suggestions),
        )
        .route("/api/items_static_filters", get(autocomplete::items_static_filters))
        .route(
            "/api/activities_static_filters",
            get(autocomplete::activities_static_filters),
        )
        .route(
            "/api/plugin_autocomplete/{slug}",
            get(autocomplete::plugin_autocomplete),
        )
}

/// Routes reachable without a session.
pub fn public_router<S: CatalogStore + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/auth/signup", axum::routing::post(auth::signup))
        .route("/auth/login", axum::routing::post(auth::login))
        .route("/auth/user_is_logged_in", get(auth::user_is_logged_in))
        .route("/api/version", get(version))
        .route("/health", get(health_check))
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Reports the running commit hash.
async fn version<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Value> {
    Json(json!({ "version": state.config.commit_hash }))
}

/// Reads the `file` field of a multipart upload and stores it under the
/// media directory, namespaced by user. Returns the stored relative path.
pub(crate) async fn save_upload(
    media_dir: &str,
    user_token: &str,
    mut multipart: Multipart,
) -> ServerResult<String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or("upload"));
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::InvalidRequest(format!("Failed to read upload: {}", e)))?;

        let relative = format!(
            "{}/{}_{}",
            user_token,
            chrono::Utc::now().timestamp_millis(),
            file_name
        );
        let target = Path::new(media_dir).join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServerError::Internal(format!("Failed to create media dir: {}", e)))?;
        }
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to store upload: {}", e)))?;
        return Ok(relative);
    }
    Err(ServerError::InvalidRequest(
        "Missing multipart field 'file'".to_string(),
    ))
}

/// Best-effort removal of a previously stored media file.
pub(crate) async fn remove_media(media_dir: &str, relative: &str) {
    let target = Path::new(media_dir).join(relative);
    if let Err(e) = tokio::fs::remove_file(&target).await {
        tracing::debug!(path = %target.display(), "Failed to remove media file: {}", e);
    }
}

/// Deserializes a field that must distinguish "absent" from "present but
/// null": absent stays `None`, an explicit `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Strips path components and awkward characters from an uploaded file name.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::create_app;
    use ::auth::MemorySessionStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use catalog_store::MemoryCatalogStore;
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("icon.png"), "icon.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my icon!.png"), "my_icon_.png");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    fn test_app() -> Router {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            media_dir: std::env::temp_dir().display().to_string(),
            web_host: "http://localhost".to_string(),
            session_ttl_hours: 24,
            commit_hash: "test".to_string(),
            log_level: "warn".to_string(),
        };
        let state = Arc::new(AppState::new(
            config,
            MemoryCatalogStore::new(),
            Box::new(MemorySessionStore::new()),
        ));
        create_app(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn signup(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/signup",
                None,
                json!({"email": "reader@example.com", "password": "correct horse"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let app = test_app();
        let (status, _) = send(
            &app,
            Request::builder()
                .uri("/api/item_type")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signup_seeds_default_catalog_and_logs_in() {
        let app = test_app();
        let cookie = signup(&app).await;

        let (status, body) = send(
            &app,
            Request::builder()
                .uri("/api/item_type")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let slugs: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["slug"].as_str().unwrap())
            .collect();
        assert!(slugs.contains(&"book"));
        assert!(slugs.contains(&"movie"));
        assert!(slugs.contains(&"book-series"));
        assert!(slugs.contains(&"video_game"));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let app = test_app();
        signup(&app).await;

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/auth/login",
                None,
                json!({"email": "reader@example.com", "password": "wrong horse"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_activity_create_pipeline() {
        let app = test_app();
        let cookie = signup(&app).await;

        let request_body = json!({
            "itemDetails": {
                "item_type": "book",
                "info": {"title": "Dune", "author": "Frank Herbert"}
            },
            "activityDetails": {"rating": 4.0, "finished": true}
        });
        let (status, body) = send(
            &app,
            json_request("POST", "/api/activity", Some(&cookie), request_body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["rating"], json!(0.8));
        assert_eq!(body["item_name"], json!("Dune"));
        assert_eq!(body["finished"], json!(true));

        // A second activity for the same book reuses the item.
        let (status, _) = send(
            &app,
            json_request("POST", "/api/activity", Some(&cookie), request_body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            Request::builder()
                .uri("/api/item?item_type=book")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], json!("Dune"));

        let (status, body) = send(
            &app,
            Request::builder()
                .uri("/api/activity")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_activity_create_rejects_invalid_info() {
        let app = test_app();
        let cookie = signup(&app).await;

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/activity",
                Some(&cookie),
                json!({
                    "itemDetails": {"item_type": "book", "info": {"title": "Dune"}},
                    "activityDetails": {}
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(
            &app,
            Request::builder()
                .uri("/api/item")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let app = test_app();
        let cookie = signup(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "PATCH",
                "/api/settings",
                Some(&cookie),
                json!({"settings": {"ratingMax": 10}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"]["ratingMax"], json!(10));
        // Unmentioned keys survive the merge.
        assert_eq!(
            body["settings"]["itemTypesInQuickMenu"],
            json!(["book", "movie"])
        );

        let (_, body) = send(
            &app,
            Request::builder()
                .uri("/api/settings")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(body["settings"]["ratingMax"], json!(10));
    }

    #[tokio::test]
    async fn test_version_is_public() {
        let app = test_app();
        let (status, body) = send(
            &app,
            Request::builder()
                .uri("/api/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], json!("test"));
    }
}
