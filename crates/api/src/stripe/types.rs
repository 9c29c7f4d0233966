//! Stripe API request and response types (the subset FreshCart uses).

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use freshcart_core::{OrderId, UserId};

use super::StripeError;

/// Metadata key holding the order ID.
pub const METADATA_ORDER_ID: &str = "order_id";
/// Metadata key holding the user ID.
pub const METADATA_USER_ID: &str = "user_id";

/// One line shown on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub name: String,
    /// Unit price in the store currency (major units).
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Everything needed to open a checkout session for an order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<CheckoutLine>,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    /// Encode as Stripe's bracketed form fields.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Amount` if a unit price doesn't fit in minor units.
    pub fn to_form(&self, currency: &str) -> Result<Vec<(String, String)>, StripeError> {
        let order_id = self.order_id.to_string();
        let user_id = self.user_id.to_string();

        let mut form = vec![
            ("mode".to_owned(), "payment".to_owned()),
            ("success_url".to_owned(), self.success_url.clone()),
            ("cancel_url".to_owned(), self.cancel_url.clone()),
            ("client_reference_id".to_owned(), order_id.clone()),
            (format!("metadata[{METADATA_ORDER_ID}]"), order_id.clone()),
            (format!("metadata[{METADATA_USER_ID}]"), user_id.clone()),
            (
                format!("payment_intent_data[metadata][{METADATA_ORDER_ID}]"),
                order_id,
            ),
            (
                format!("payment_intent_data[metadata][{METADATA_USER_ID}]"),
                user_id,
            ),
        ];

        for (i, line) in self.lines.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((
                format!("{prefix}[price_data][currency]"),
                currency.to_owned(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                line.name.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                to_minor_units(line.unit_price)?.to_string(),
            ));
            form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
        }

        Ok(form)
    }
}

/// Convert a major-unit amount to cents, rounding half away from zero.
///
/// # Errors
///
/// Returns `StripeError::Amount` for negative or oversized amounts.
pub fn to_minor_units(amount: Decimal) -> Result<i64, StripeError> {
    if amount.is_sign_negative() {
        return Err(StripeError::Amount(amount));
    }
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(StripeError::Amount(amount))
}

/// A Checkout Session object.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A list response (`{"data": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
}

/// Error body returned by the Stripe API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

/// The `data` member of an event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The fields of a PaymentIntent the webhook needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Order correlation recovered from Stripe metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRef {
    pub order_id: OrderId,
    pub user_id: UserId,
}

impl OrderRef {
    /// Read `order_id`/`user_id` from a metadata map. `None` if either is
    /// absent or not an integer.
    #[must_use]
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Option<Self> {
        let order_id = metadata.get(METADATA_ORDER_ID)?.parse().ok()?;
        let user_id = metadata.get(METADATA_USER_ID)?.parse().ok()?;
        Some(Self { order_id, user_id })
    }
}
