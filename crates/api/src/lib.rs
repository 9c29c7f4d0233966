//! FreshCart API library.
//!
//! The JSON REST backend for the FreshCart storefront client and seller
//! dashboard, exposed as a library so the binary, the CLI and the tests
//! share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header::CONTENT_TYPE},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::middleware::{
    ClientIpKeyExtractor, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Build the complete application router.
///
/// Layers, innermost first: security headers, request ID, tracing, CORS and
/// the Sentry hub/transaction layers.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config());

    let client_ip = ClientIpKeyExtractor::new(state.config().trust_proxy_headers);

    routes::routes(client_ip)
        .with_state(state)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(cors)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the configured storefront origins, with credentials so the auth
/// cookies are sent.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .client_origins
        .iter()
        .filter_map(|url| HeaderValue::from_str(&url.origin().ascii_serialization()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
}
