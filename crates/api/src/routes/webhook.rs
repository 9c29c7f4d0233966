//! Stripe webhook receiver.
//!
//! The body must be the raw bytes Stripe signed, so this route takes
//! [`Bytes`] rather than JSON. Verification or parse failures answer 400;
//! store failures answer 500 so Stripe redelivers.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::error::{AppError, add_breadcrumb};
use crate::services::orders::{OrderService, PaymentAction};
use crate::state::AppState;
use crate::stripe::{Event, verify_signature};

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
pub struct Received {
    pub received: bool,
}

/// `POST /stripe`
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Received>, AppError> {
    let Some(stripe) = state.stripe() else {
        return Err(AppError::NotFound(
            "Online payments are not configured".to_string(),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    verify_signature(
        stripe.webhook_secret().expose_secret(),
        signature,
        &body,
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook");
        AppError::BadRequest(format!("Webhook Error: {e}"))
    })?;

    let event: Event = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Webhook Error: {e}")))?;
    let outcome = event
        .outcome()
        .map_err(|e| AppError::BadRequest(format!("Webhook Error: {e}")))?;

    add_breadcrumb("stripe", &event.kind, Some(&[("event_id", event.id.as_str())]));

    let action = OrderService::new(state.pool(), Some(stripe))
        .apply_payment(outcome)
        .await?;

    if action == PaymentAction::Unmatched {
        tracing::warn!(event_id = %event.id, "Webhook could not be matched to an order");
    }

    Ok(Json(Received { received: true }))
}
