//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `SELLER_EMAIL` - Login email of the store's seller account
//! - `SELLER_PASSWORD` - Password of the seller account
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 4000)
//! - `CLIENT_ORIGINS` - Comma-separated SPA origins allowed by CORS
//!   (default: `http://localhost:5173`)
//! - `COOKIE_SECURE` - Mark auth cookies `Secure` + `SameSite=None` (default: false)
//! - `TRUST_PROXY_HEADERS` - Key rate limits on `CF-Connecting-IP` /
//!   `X-Forwarded-For` / `X-Real-IP`; only set behind a proxy that overwrites
//!   them (default: false)
//! - `STRIPE_SECRET_KEY` / `STRIPE_WEBHOOK_SECRET` - Enable online payments
//!   (both or neither)
//! - `STRIPE_CURRENCY` - ISO currency for checkout sessions (default: usd)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: `https://api.stripe.com`)
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use freshcart_core::Email;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:5173";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Origins of the storefront client, first one is the default redirect base
    pub client_origins: Vec<Url>,
    /// Whether auth cookies require HTTPS
    pub cookie_secure: bool,
    /// Whether client IPs may be taken from proxy headers
    pub trust_proxy_headers: bool,
    /// Secret used to sign user and seller tokens
    pub jwt_secret: SecretString,
    /// Seller account credentials
    pub seller: SellerConfig,
    /// Stripe configuration; `None` disables online payments
    pub stripe: Option<StripeConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// The single seller account allowed into the dashboard endpoints.
#[derive(Clone)]
pub struct SellerConfig {
    pub email: Email,
    pub password: SecretString,
}

impl std::fmt::Debug for SellerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SellerConfig")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// Lowercase ISO 4217 currency code
    pub currency: String,
    /// API base URL, overridable for test doubles
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the signing secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = get_env_or_default("API_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("API_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_PORT".to_string(), e.to_string()))?;
        let client_origins =
            parse_origins(&get_env_or_default("CLIENT_ORIGINS", DEFAULT_CLIENT_ORIGIN))?;
        let cookie_secure = parse_bool("COOKIE_SECURE", &get_env_or_default("COOKIE_SECURE", "false"))?;
        let trust_proxy_headers = parse_bool(
            "TRUST_PROXY_HEADERS",
            &get_env_or_default("TRUST_PROXY_HEADERS", "false"),
        )?;

        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;

        let seller = SellerConfig::from_env()?;
        let stripe = StripeConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            client_origins,
            cookie_secure,
            trust_proxy_headers,
            jwt_secret,
            seller,
            stripe,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Pick the client origin to redirect to after checkout.
    ///
    /// The request's `Origin` header is honoured only when it is one of the
    /// configured origins; otherwise the first configured origin is used.
    #[must_use]
    pub fn redirect_origin(&self, requested: Option<&str>) -> String {
        let configured = self
            .client_origins
            .iter()
            .map(|u| u.origin().ascii_serialization());

        if let Some(requested) = requested
            && let Some(found) = configured.clone().find(|o| o == requested)
        {
            return found;
        }

        configured
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_CLIENT_ORIGIN.to_string())
    }
}

impl SellerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let email = Email::parse(&get_required_env("SELLER_EMAIL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("SELLER_EMAIL".to_string(), e.to_string()))?;
        let password = get_required_env("SELLER_PASSWORD")?;
        if password.len() < 8 {
            return Err(ConfigError::InsecureSecret(
                "SELLER_PASSWORD".to_string(),
                "must be at least 8 characters".to_string(),
            ));
        }

        Ok(Self {
            email,
            password: SecretString::from(password),
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("STRIPE_SECRET_KEY"),
            get_optional_env("STRIPE_WEBHOOK_SECRET"),
        ) {
            (None, None) => Ok(None),
            (Some(secret_key), Some(webhook_secret)) => Ok(Some(Self {
                secret_key: SecretString::from(secret_key),
                webhook_secret: SecretString::from(webhook_secret),
                currency: get_env_or_default("STRIPE_CURRENCY", "usd").to_lowercase(),
                api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            })),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "STRIPE_WEBHOOK_SECRET".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("STRIPE_SECRET_KEY".to_string())),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse a comma-separated list of origins.
fn parse_origins(raw: &str) -> Result<Vec<Url>, ConfigError> {
    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Url::parse(s)
                .map_err(|e| ConfigError::InvalidEnvVar("CLIENT_ORIGINS".to_string(), format!("{s}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if origins.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "CLIENT_ORIGINS".to_string(),
            "at least one origin is required".to_string(),
        ));
    }
    Ok(origins)
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_JWT_SECRET_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // secret lengths are tiny
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder-looking or low-entropy secrets.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
