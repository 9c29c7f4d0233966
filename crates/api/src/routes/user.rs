//! Customer account handlers.

use axum::{extract::State, http::HeaderMap, response::Response};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, clear_sentry_user};
use crate::middleware::RequireUser;
use crate::middleware::auth::{USER_COOKIE, read_cookie, removal_cookie, session_cookie};
use crate::models::User;
use crate::response::ApiResponse;
use crate::services::auth::{AuthService, Identity};
use crate::state::AppState;

use super::{JsonBody, with_cookie};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub user: User,
}

/// `POST /api/user/register`
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<Response, AppError> {
    let user = AuthService::new(state.pool())
        .register(&body.name, &body.email, &body.password)
        .await?;

    sign_in(&state, user)
}

/// `POST /api/user/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");
    sign_in(&state, user)
}

fn sign_in(state: &AppState, user: User) -> Result<Response, AppError> {
    let token = state.token_keys().issue(&Identity::User(user.id))?;
    let cookie = session_cookie(USER_COOKIE, token, state.config().cookie_secure);
    with_cookie(cookie, ApiResponse::ok(UserPayload { user }))
}

/// `GET /api/user/is-auth`
pub async fn is_auth(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<ApiResponse<UserPayload>, AppError> {
    let user = AuthService::new(state.pool()).get_user(user_id).await?;
    Ok(ApiResponse::ok(UserPayload { user }))
}

/// `GET /api/user/logout`
///
/// Always succeeds; the cached identity for the presented token is dropped.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = read_cookie(&headers, USER_COOKIE) {
        state.token_cache().invalidate(&token).await;
    }
    clear_sentry_user();

    let cookie = removal_cookie(USER_COOKIE, state.config().cookie_secure);
    with_cookie(cookie, ApiResponse::message("Logged Out"))
}
