//! Auth API endpoints: signup, login, logout, session probe.

use std::sync::Arc;

use auth::{hash_password, verify_password, AuthError, Session};
use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use catalog_store::{seed_default_item_types, CatalogStore};
use entities::User;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};
use crate::middleware::{auth::resolve_session, CurrentUser, SESSION_COOKIE};
use crate::state::AppState;

/// Signup and login request body.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Email address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

async fn open_session<S: CatalogStore>(
    state: &AppState<S>,
    user: &User,
) -> ServerResult<Session> {
    let session = Session::new(&user.token, state.config.session_ttl_hours);
    state.sessions.store(&session).await?;
    Ok(session)
}

/// Creates a new account, seeds its default catalog and logs it in.
pub async fn signup<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
    Json(request): Json<CredentialsRequest>,
) -> ServerResult<(CookieJar, (StatusCode, Json<Value>))> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServerError::InvalidRequest("Invalid email address".to_string()));
    }
    if request.password.len() < 8 {
        return Err(ServerError::InvalidRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let user = User::new(email, password_hash);
    state.store.create_user(&user).await?;
    seed_default_item_types(&state.store, &user.token).await?;

    tracing::info!(user = %user.token, "User signed up");

    let session = open_session(&state, &user).await?;
    Ok((
        jar.add(session_cookie(session.token)),
        (StatusCode::CREATED, Json(json!({ "token": user.token }))),
    ))
}

/// Authenticates an email/password pair and opens a session.
pub async fn login<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
    Json(request): Json<CredentialsRequest>,
) -> ServerResult<(CookieJar, Json<Value>)> {
    let email = request.email.trim().to_lowercase();
    let user = state
        .store
        .get_user_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&request.password, &user.password_hash) {
        tracing::info!(email = %email, "Failed login");
        return Err(AuthError::InvalidCredentials.into());
    }

    tracing::info!(user = %user.token, "Successful login");
    let session = open_session(&state, &user).await?;
    Ok((jar.add(session_cookie(session.token)), Json(json!({}))))
}

/// Closes the current session.
pub async fn logout<S: CatalogStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> ServerResult<(CookieJar, Json<Value>)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value()).await?;
    }
    tracing::info!(user = %user.token, "Logged out");
    Ok((jar.remove(Cookie::from(SESSION_COOKIE)), Json(json!({}))))
}

/// Reports whether the request carries a live session.
pub async fn user_is_logged_in<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
) -> Json<Value> {
    let authenticated = resolve_session(state.as_ref(), &jar).await.is_some();
    Json(json!({ "authenticated": authenticated }))
}
