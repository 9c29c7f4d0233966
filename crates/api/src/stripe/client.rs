//! Stripe REST client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::StripeError;
use super::types::{ApiErrorBody, CheckoutRequest, CheckoutSession, List};
use crate::config::StripeConfig;

/// Request timeout for Stripe API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the Stripe Checkout API.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
    webhook_secret: SecretString,
    currency: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.inner.api_base)
            .field("currency", &self.inner.currency)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_owned(),
                secret_key: config.secret_key.clone(),
                webhook_secret: config.webhook_secret.clone(),
                currency: config.currency.clone(),
            }),
        })
    }

    /// Webhook signing secret (`whsec_...`).
    #[must_use]
    pub fn webhook_secret(&self) -> &SecretString {
        &self.inner.webhook_secret
    }

    /// Create a hosted Checkout session.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` if Stripe rejects the request, or
    /// `StripeError::MissingUrl` if the session has no redirect URL.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let form = request.to_form(&self.inner.currency)?;

        let response = self
            .inner
            .client
            .post(format!("{}/v1/checkout/sessions", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let session: CheckoutSession = parse_response(response).await?;
        if session.url.is_none() {
            return Err(StripeError::MissingUrl(session.id));
        }

        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }

    /// Find the checkout session that produced a payment intent.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` if Stripe rejects the request.
    #[instrument(skip(self))]
    pub async fn find_session_by_payment_intent(
        &self,
        payment_intent: &str,
    ) -> Result<Option<CheckoutSession>, StripeError> {
        let response = self
            .inner
            .client
            .get(format!("{}/v1/checkout/sessions", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .query(&[("payment_intent", payment_intent), ("limit", "1")])
            .send()
            .await?;

        let list: List<CheckoutSession> = parse_response(response).await?;
        Ok(list.data.into_iter().next())
    }
}

/// Decode a Stripe response, turning error bodies into `StripeError::Api`.
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, StripeError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or_else(|| body.chars().take(200).collect());
        tracing::error!(status = %status, message = %message, "Stripe API returned non-success status");
        return Err(StripeError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse Stripe response"
        );
        StripeError::Parse(e)
    })
}
