//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::auth::{TokenCache, TokenKeys};
use crate::services::catalog::ProductCache;
use crate::stripe::{StripeClient, StripeError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    token_keys: TokenKeys,
    token_cache: TokenCache,
    product_cache: ProductCache,
    stripe: Option<StripeClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StripeError> {
        let stripe = config.stripe.as_ref().map(StripeClient::new).transpose()?;
        let token_keys = TokenKeys::new(&config.jwt_secret);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                token_keys,
                token_cache: TokenCache::default(),
                product_cache: ProductCache::default(),
                stripe,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Token signing/verification keys.
    #[must_use]
    pub fn token_keys(&self) -> &TokenKeys {
        &self.inner.token_keys
    }

    /// Cache of verified tokens.
    #[must_use]
    pub fn token_cache(&self) -> &TokenCache {
        &self.inner.token_cache
    }

    /// Cache of product listings.
    #[must_use]
    pub fn product_cache(&self) -> &ProductCache {
        &self.inner.product_cache
    }

    /// Stripe client, if online payment is configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }
}
