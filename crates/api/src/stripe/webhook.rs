//! Webhook signature verification and event interpretation.
//!
//! `Stripe-Signature: t=<unix seconds>,v1=<hex>[,v1=<hex>...]` where each
//! `v1` is `HMAC-SHA256(secret, "{t}.{raw body}")`. Any matching `v1` is
//! accepted so signing-secret rotation works.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::StripeError;
use super::types::{Event, OrderRef, PaymentIntent};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook (replay window).
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` if the header is malformed, the
/// timestamp is outside the tolerance window, or no signature matches.
pub fn verify_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature(
            "missing v1 signature".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::InvalidSignature("invalid timestamp".to_string()))?;
    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(StripeError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);

        // verify_slice compares in constant time
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(StripeError::InvalidSignature(
        "signature mismatch".to_string(),
    ))
}

/// What a webhook event means for FreshCart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment captured; `order` is `None` if the intent carried no metadata.
    Succeeded {
        payment_intent: String,
        order: Option<OrderRef>,
    },
    /// Payment attempt failed.
    Failed {
        payment_intent: String,
        order: Option<OrderRef>,
    },
    /// Any other event type; acknowledged and ignored.
    Ignored(String),
}

impl Event {
    /// Interpret the event.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Parse` if a payment-intent event has a malformed
    /// `data.object`.
    pub fn outcome(&self) -> Result<PaymentOutcome, StripeError> {
        let succeeded = match self.kind.as_str() {
            "payment_intent.succeeded" => true,
            "payment_intent.payment_failed" => false,
            other => return Ok(PaymentOutcome::Ignored(other.to_owned())),
        };

        let intent: PaymentIntent = serde_json::from_value(self.data.object.clone())?;
        let order = OrderRef::from_metadata(&intent.metadata);

        Ok(if succeeded {
            PaymentOutcome::Succeeded {
                payment_intent: intent.id,
                order,
            }
        } else {
            PaymentOutcome::Failed {
                payment_intent: intent.id,
                order,
            }
        })
    }
}
