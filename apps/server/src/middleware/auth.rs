//! Session authentication middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use catalog_store::CatalogStore;
use entities::User;
use serde_json::json;

use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "trove_session";

/// The authenticated user attached to request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extracts the session token from the request's cookies.
fn extract_session_token(request: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(request.headers());
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": { "code": "AUTHENTICATION_REQUIRED", "message": message } })),
    )
        .into_response()
}

/// Session authentication middleware.
///
/// Extracts the session cookie, resolves it to a live session, loads the
/// matching user and stores it in the request extensions. Requests without
/// a valid, unexpired session are rejected with 401.
pub async fn require_session<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_session_token(&request) {
        Some(token) => token,
        None => return unauthorized("Missing session cookie"),
    };

    let session = match state.sessions.get(&token).await {
        Ok(Some(session)) => session,
        Ok(None) => return unauthorized("Invalid or expired session"),
        Err(e) => {
            tracing::error!("session lookup failed: {}", e);
            return unauthorized("Invalid or expired session");
        }
    };

    let user = match state.store.get_user(&session.user_token).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized("Unknown user"),
        Err(e) => {
            tracing::error!("user lookup failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": { "code": "INTERNAL_ERROR", "message": "user lookup failed" } })),
            )
                .into_response();
        }
    };

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

/// Resolves the session cookie to a user without rejecting the request.
///
/// Used by endpoints that report login status rather than requiring it.
pub async fn resolve_session<S: CatalogStore + 'static>(
    state: &AppState<S>,
    jar: &CookieJar,
) -> Option<User> {
    let token = jar.get(SESSION_COOKIE)?.value().to_string();
    let session = state.sessions.get(&token).await.ok().flatten()?;
    state.store.get_user(&session.user_token).await.ok().flatten()
}
