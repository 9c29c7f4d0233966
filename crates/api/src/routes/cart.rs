//! Cart handlers.

use axum::extract::State;
use serde::Deserialize;

use freshcart_core::CartItems;

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::response::ApiResponse;
use crate::services::cart::{CartService, CartView};
use crate::state::AppState;

use super::JsonBody;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    #[serde(default)]
    pub cart_items: CartItems,
}

/// `GET /api/cart/get`
pub async fn get(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<ApiResponse<CartView>, AppError> {
    let cart = CartService::new(state.pool()).get(user_id).await?;
    Ok(ApiResponse::ok(cart))
}

/// `POST /api/cart/update`
///
/// Replaces the whole cart.
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    JsonBody(body): JsonBody<UpdateCartRequest>,
) -> Result<ApiResponse<CartView>, AppError> {
    let cart = CartService::new(state.pool())
        .replace(user_id, body.cart_items)
        .await?;
    Ok(ApiResponse::ok(cart).with_message("Cart Updated"))
}
