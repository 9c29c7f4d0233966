//! Order handlers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, header::ORIGIN},
};
use serde::{Deserialize, Serialize};

use freshcart_core::{AddressId, OrderId, OrderLineRequest, OrderStatus};

use crate::error::AppError;
use crate::middleware::{RequireSeller, RequireUser};
use crate::models::{Order, OrderView};
use crate::response::ApiResponse;
use crate::services::orders::OrderService;
use crate::state::AppState;

use super::{JsonBody, parse_id};

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    pub address: Option<AddressId>,
}

impl PlaceOrderRequest {
    fn address(&self) -> Result<AddressId, AppError> {
        self.address
            .ok_or_else(|| AppError::BadRequest("Address is required".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct OrderPayload {
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrdersPayload {
    pub orders: Vec<OrderView>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutPayload {
    pub url: String,
}

/// `POST /api/order/cod`
pub async fn place_cod(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    JsonBody(body): JsonBody<PlaceOrderRequest>,
) -> Result<ApiResponse<OrderPayload>, AppError> {
    let address = body.address()?;
    let order = OrderService::new(state.pool(), state.stripe())
        .place_cod(user_id, address, &body.items)
        .await?;
    Ok(ApiResponse::ok(OrderPayload { order }).with_message("Order Placed Successfully"))
}

/// `POST /api/order/stripe`
///
/// Answers with the hosted checkout URL. Success and cancel redirects go to
/// the request's `Origin` when it is a configured client origin.
pub async fn place_online(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    headers: HeaderMap,
    JsonBody(body): JsonBody<PlaceOrderRequest>,
) -> Result<ApiResponse<CheckoutPayload>, AppError> {
    let address = body.address()?;
    let requested = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    let origin = state.config().redirect_origin(requested);

    let (_order, url) = OrderService::new(state.pool(), state.stripe())
        .place_online(user_id, address, &body.items, &origin)
        .await?;
    Ok(ApiResponse::ok(CheckoutPayload { url }))
}

/// `GET /api/order/user`
pub async fn user_orders(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<ApiResponse<OrdersPayload>, AppError> {
    let orders = OrderService::new(state.pool(), state.stripe())
        .list_for_user(user_id)
        .await?;
    Ok(ApiResponse::ok(OrdersPayload { orders }))
}

/// `GET /api/order/seller`
pub async fn seller_orders(
    State(state): State<AppState>,
    _seller: RequireSeller,
) -> Result<ApiResponse<OrdersPayload>, AppError> {
    let orders = OrderService::new(state.pool(), state.stripe())
        .list_all()
        .await?;
    Ok(ApiResponse::ok(OrdersPayload { orders }))
}

/// `PUT /api/order/status/{orderId}`
pub async fn update_status(
    State(state): State<AppState>,
    _seller: RequireSeller,
    Path(order_id): Path<String>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> Result<ApiResponse<OrderPayload>, AppError> {
    let order_id: OrderId = parse_id(&order_id, "order")?;
    let status: OrderStatus = body.status.parse().map_err(AppError::BadRequest)?;

    let order = OrderService::new(state.pool(), state.stripe())
        .update_status(order_id, status)
        .await?;
    Ok(ApiResponse::ok(OrderPayload { order }).with_message("Status Updated"))
}
