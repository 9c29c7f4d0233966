//! Integration tests for FreshCart.
//!
//! # Running Tests
//!
//! ```bash
//! # Pure tests (no services needed)
//! cargo test -p freshcart-integration-tests
//!
//! # Live tests against a running API and database. The seller credentials,
//! # webhook secret and database URL must match the server's.
//! FRESHCART_API_URL=http://localhost:4000 \
//! DATABASE_URL=postgres://... SELLER_EMAIL=... SELLER_PASSWORD=... \
//! STRIPE_WEBHOOK_SECRET=whsec_... \
//!     cargo test -p freshcart-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `pricing` - Cart totals, order pricing and status rules from the core crate
//! - `api_contract` - Envelope, tokens, webhook signatures and checkout encoding
//! - `storefront_flow` - End-to-end customer flow over HTTP (ignored by default)

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Base URL of a running API (configurable via environment).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("FRESHCART_API_URL").unwrap_or_else(|_| "http://localhost:4000".to_string())
}

/// Read an environment variable the live tests need.
///
/// # Panics
///
/// Panics with the variable name if it is unset.
#[must_use]
pub fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("{key} must be set for live tests"))
}

/// An email address no other test run has used.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@freshcart.test", uuid::Uuid::new_v4().simple())
}

/// Build a `Stripe-Signature` header for `body` signed at `timestamp`.
///
/// # Panics
///
/// Never in practice; HMAC accepts keys of any length.
#[must_use]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
pub fn stripe_signature(secret: &str, timestamp: i64, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{body}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
