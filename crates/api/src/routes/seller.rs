//! Seller session handlers.

use axum::{extract::State, http::HeaderMap, response::Response};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::RequireSeller;
use crate::middleware::auth::{SELLER_COOKIE, read_cookie, removal_cookie, session_cookie};
use crate::response::ApiResponse;
use crate::services::auth::{Identity, verify_seller};
use crate::state::AppState;

use super::{JsonBody, with_cookie};

#[derive(Debug, Deserialize)]
pub struct SellerLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/seller/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SellerLoginRequest>,
) -> Result<Response, AppError> {
    let seller = &state.config().seller;
    verify_seller(seller, &body.email, &body.password)?;

    let token = state.token_keys().issue(&Identity::Seller {
        email: seller.email.as_str().to_owned(),
    })?;
    tracing::info!("Seller logged in");

    let cookie = session_cookie(SELLER_COOKIE, token, state.config().cookie_secure);
    with_cookie(cookie, ApiResponse::message("Logged In"))
}

/// `GET /api/seller/is-auth`
pub async fn is_auth(_seller: RequireSeller) -> ApiResponse {
    ApiResponse::message("Authorized")
}

/// `GET /api/seller/logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = read_cookie(&headers, SELLER_COOKIE) {
        state.token_cache().invalidate(&token).await;
    }

    let cookie = removal_cookie(SELLER_COOKIE, state.config().cookie_secure);
    with_cookie(cookie, ApiResponse::message("Logged Out"))
}
