//! Contract tests for the API library's wire-facing pieces.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;

use freshcart_api::response::ApiResponse;
use freshcart_api::services::auth::{Identity, TokenKeys};
use freshcart_api::stripe::{
    CheckoutLine, CheckoutRequest, Event, OrderRef, PaymentOutcome, to_minor_units,
    verify_signature,
};
use freshcart_core::{OrderId, UserId};
use freshcart_integration_tests::stripe_signature;

const WEBHOOK_SECRET: &str = "whsec_integration";

fn keys() -> TokenKeys {
    TokenKeys::new(&SecretString::from("Zq8#vN2!pL7$wX4@tR9%kM3^bH6&cJ1*"))
}

#[test]
fn test_failure_envelope_shape() {
    let body = serde_json::to_value(ApiResponse::failure("Product not found")).unwrap();
    assert_eq!(body, json!({"success": false, "message": "Product not found"}));
}

#[test]
fn test_tokens_carry_identity_and_reject_tampering() {
    let keys = keys();
    let token = keys.issue(&Identity::User(UserId::new(42))).unwrap();
    assert_eq!(keys.verify(&token).unwrap(), Identity::User(UserId::new(42)));

    let (head, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{head}.{flipped}{}", &signature[1..]);
    assert!(keys.verify(&tampered).is_err());

    let other = TokenKeys::new(&SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"));
    assert!(other.verify(&token).is_err());
}

#[test]
fn test_signed_payment_event_resolves_order() {
    let body = json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": {"object": {
            "id": "pi_1",
            "metadata": {"order_id": "17", "user_id": "4"}
        }}
    })
    .to_string();
    let now = 1_760_000_000;
    let header = stripe_signature(WEBHOOK_SECRET, now, &body);

    verify_signature(WEBHOOK_SECRET, &header, body.as_bytes(), now + 30).unwrap();

    let event: Event = serde_json::from_str(&body).unwrap();
    assert_eq!(
        event.outcome().unwrap(),
        PaymentOutcome::Succeeded {
            payment_intent: "pi_1".to_string(),
            order: Some(OrderRef {
                order_id: OrderId::new(17),
                user_id: UserId::new(4),
            }),
        }
    );
}

#[test]
fn test_webhook_signature_rejections() {
    let body = r#"{"id":"evt_2","type":"payment_intent.payment_failed"}"#;
    let now = 1_760_000_000;

    let stale = stripe_signature(WEBHOOK_SECRET, now - 301, body);
    assert!(verify_signature(WEBHOOK_SECRET, &stale, body.as_bytes(), now).is_err());

    let wrong_secret = stripe_signature("whsec_other", now, body);
    assert!(verify_signature(WEBHOOK_SECRET, &wrong_secret, body.as_bytes(), now).is_err());

    let signed = stripe_signature(WEBHOOK_SECRET, now, body);
    assert!(verify_signature(WEBHOOK_SECRET, &signed, b"{}", now).is_err());
}

#[test]
fn test_checkout_form_charges_order_amount() {
    let request = CheckoutRequest {
        order_id: OrderId::new(8),
        user_id: UserId::new(2),
        lines: vec![
            CheckoutLine {
                name: "Organic Bananas".to_string(),
                unit_price: Decimal::new(8, 0),
                quantity: 2,
            },
            CheckoutLine {
                name: "Tax".to_string(),
                unit_price: Decimal::new(5, 0),
                quantity: 1,
            },
        ],
        success_url: "http://localhost:5173/loader?next=my-orders".to_string(),
        cancel_url: "http://localhost:5173/cart".to_string(),
    };

    let form = request.to_form("usd").unwrap();
    let get = |key: &str| {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap()
    };

    assert_eq!(get("metadata[order_id]"), "8");
    assert_eq!(get("payment_intent_data[metadata][user_id]"), "2");
    assert_eq!(get("line_items[0][price_data][unit_amount]"), "800");
    assert_eq!(get("line_items[1][price_data][product_data][name]"), "Tax");
    assert_eq!(to_minor_units(Decimal::new(1999, 2)).unwrap(), 1999);
    assert!(to_minor_units(Decimal::new(-1, 0)).is_err());
}
