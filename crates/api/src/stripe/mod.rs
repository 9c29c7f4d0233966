//! Stripe Checkout client and webhook verification.
//!
//! # Architecture
//!
//! - Plain `reqwest` form posts against the Stripe REST API (no SDK)
//! - Checkout sessions carry `order_id`/`user_id` metadata, copied onto the
//!   payment intent so webhooks can correlate without a lookup
//! - Webhooks are authenticated with the `Stripe-Signature` HMAC scheme and
//!   a five-minute replay window
//!
//! # Example
//!
//! ```rust,ignore
//! use freshcart_api::stripe::{CheckoutRequest, StripeClient};
//!
//! let client = StripeClient::new(&config.stripe)?;
//! let session = client.create_checkout_session(&request).await?;
//! let redirect = session.url;
//! ```

mod client;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use types::*;
pub use webhook::{PaymentOutcome, SIGNATURE_TOLERANCE_SECS, verify_signature};

use thiserror::Error;

/// Errors that can occur when talking to Stripe or handling its webhooks.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with a non-success status.
    #[error("Stripe API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Stripe's error message.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An amount could not be expressed in minor currency units.
    #[error("amount out of range: {0}")]
    Amount(rust_decimal::Decimal),

    /// Webhook signature header missing, malformed, stale, or wrong.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Stripe returned a session without a redirect URL.
    #[error("checkout session {0} has no URL")]
    MissingUrl(String),
}
