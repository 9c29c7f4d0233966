//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. CORS (credentialed, configured origins only)
//! 3. `TraceLayer` (request tracing, `request_id` span field)
//! 4. Request ID (add unique ID to each request)
//! 5. Security headers
//! 6. Rate limiting (governor) on auth and checkout routes

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{RequireSeller, RequireUser, SELLER_COOKIE, USER_COOKIE};
pub use rate_limit::{
    ClientIpKeyExtractor, api_rate_limiter, auth_rate_limiter, rate_limit_envelope,
};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
