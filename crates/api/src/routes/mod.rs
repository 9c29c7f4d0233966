//! HTTP route handlers for the FreshCart API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                              - "API is Working"
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Readiness (database ping)
//!
//! # Users
//! POST   /api/user/register             - Register, sets `token` cookie
//! POST   /api/user/login                - Login, sets `token` cookie
//! GET    /api/user/is-auth              - Current user (auth)
//! GET    /api/user/logout               - Clear `token` cookie
//!
//! # Seller
//! POST   /api/seller/login              - Login, sets `sellerToken` cookie
//! GET    /api/seller/is-auth            - Seller session check (seller)
//! GET    /api/seller/logout             - Clear `sellerToken` cookie
//!
//! # Products
//! GET    /api/product/list              - All products
//! GET    /api/product/{id}              - One product
//! GET    /api/product/category/{name}   - Products in a category
//! POST   /api/product/add               - Add (seller, multipart `productData`)
//! PUT    /api/product/stock             - Toggle stock (seller)
//! DELETE /api/product/remove/{id}       - Delete (seller)
//!
//! # Cart / Addresses (auth)
//! GET    /api/cart/get                  - Cart with total
//! POST   /api/cart/update               - Replace cart
//! GET    /api/address/get               - User's addresses
//! POST   /api/address/add               - Add address
//!
//! # Orders
//! POST   /api/order/cod                 - Place COD order (auth)
//! POST   /api/order/stripe              - Place online order, returns checkout URL (auth)
//! GET    /api/order/user                - User's orders (auth)
//! GET    /api/order/seller              - All orders (seller)
//! PUT    /api/order/status/{orderId}    - Update status (seller)
//!
//! # Webhooks
//! POST   /stripe                        - Stripe webhook (raw body, signed)
//! ```

pub mod address;
pub mod cart;
pub mod health;
pub mod order;
pub mod product;
pub mod seller;
pub mod user;
pub mod webhook;

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::{HeaderValue, header::SET_COOKIE},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::AppError;
use crate::middleware::{
    ClientIpKeyExtractor, api_rate_limiter, auth_rate_limiter, rate_limit_envelope,
};
use crate::response::ApiResponse;
use crate::state::AppState;

/// JSON body extractor whose rejections use the error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(&rejection)),
        }
    }
}

fn json_rejection(rejection: &JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Parse a path segment into an ID, answering 400 on garbage.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {what} id")))
}

/// Attach a `Set-Cookie` header to an envelope.
pub(crate) fn with_cookie<T: Serialize>(
    cookie: Option<HeaderValue>,
    body: ApiResponse<T>,
) -> Result<Response, AppError> {
    let cookie = cookie.ok_or_else(|| AppError::Internal("failed to encode cookie".to_string()))?;
    Ok(([(SET_COOKIE, cookie)], body).into_response())
}

/// Customer account routes. Register and login are rate limited.
pub fn user_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login))
        .layer(auth_rate_limiter(client_ip))
        .layer(middleware::map_response(rate_limit_envelope));

    Router::new()
        .merge(limited)
        .route("/is-auth", get(user::is_auth))
        .route("/logout", get(user::logout))
}

/// Seller session routes. Login is rate limited.
pub fn seller_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(seller::login))
        .layer(auth_rate_limiter(client_ip))
        .layer(middleware::map_response(rate_limit_envelope));

    Router::new()
        .merge(limited)
        .route("/is-auth", get(seller::is_auth))
        .route("/logout", get(seller::logout))
}

/// Catalog routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(product::list))
        .route("/category/{category}", get(product::by_category))
        .route("/add", post(product::add))
        .route("/stock", put(product::set_stock))
        .route("/remove/{id}", delete(product::remove))
        .route("/{id}", get(product::show))
}

/// Cart routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/get", get(cart::get))
        .route("/update", post(cart::update))
}

/// Address routes.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/get", get(address::list))
        .route("/add", post(address::add))
}

/// Order routes. Placement is rate limited.
pub fn order_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    let limited = Router::new()
        .route("/cod", post(order::place_cod))
        .route("/stripe", post(order::place_online))
        .layer(api_rate_limiter(client_ip))
        .layer(middleware::map_response(rate_limit_envelope));

    Router::new()
        .merge(limited)
        .route("/user", get(order::user_orders))
        .route("/seller", get(order::seller_orders))
        .route("/status/{order_id}", put(order::update_status))
}

/// Create all routes for the API. `client_ip` keys the rate limiters.
pub fn routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/stripe", post(webhook::stripe))
        .nest("/api/user", user_routes(client_ip))
        .nest("/api/seller", seller_routes(client_ip))
        .nest("/api/product", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/address", address_routes())
        .nest("/api/order", order_routes(client_ip))
}
