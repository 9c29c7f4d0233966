//! Authentication extractors and session cookies.
//!
//! Customers carry their token in the `token` cookie and the seller in
//! `sellerToken`. Both are `HttpOnly`; in secure deployments they are also
//! `Secure` with `SameSite=None` so the storefront on another origin can send
//! them, otherwise `SameSite=Strict`.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header::COOKIE, request::Parts},
};
use cookie::{Cookie, SameSite};

use freshcart_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::{Identity, TOKEN_TTL, unix_now};
use crate::state::AppState;

/// Cookie holding a customer's token.
pub const USER_COOKIE: &str = "token";

/// Cookie holding the seller's token.
pub const SELLER_COOKIE: &str = "sellerToken";

/// Read a cookie value from the request headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

/// Build a `Set-Cookie` header that stores `token`.
#[must_use]
pub fn session_cookie(name: &'static str, token: String, secure: bool) -> Option<HeaderValue> {
    let max_age = i64::try_from(TOKEN_TTL.as_secs()).unwrap_or(i64::MAX);
    let cookie = base_cookie(name, token, secure)
        .max_age(cookie::time::Duration::seconds(max_age))
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// Build a `Set-Cookie` header that clears the cookie.
#[must_use]
pub fn removal_cookie(name: &'static str, secure: bool) -> Option<HeaderValue> {
    let mut cookie = base_cookie(name, String::new(), secure).build();
    cookie.make_removal();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

fn base_cookie(name: &'static str, value: String, secure: bool) -> cookie::CookieBuilder<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure {
            SameSite::None
        } else {
            SameSite::Strict
        })
}

/// Verify a token through the cache, falling back to signature verification.
async fn resolve_identity(state: &AppState, token: &str) -> Option<Identity> {
    if let Some(identity) = state.token_cache().get(token, unix_now()).await {
        return Some(identity);
    }

    let verified = state.token_keys().verify_token(token).ok()?;
    let identity = verified.identity.clone();
    state.token_cache().insert(token, verified).await;
    Some(identity)
}

fn not_authorized() -> AppError {
    AppError::Unauthorized("Not Authorized".to_string())
}

/// Extractor that requires a signed-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user_id): RequireUser) -> impl IntoResponse {
///     format!("Hello, user {user_id}!")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub UserId);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = read_cookie(&parts.headers, USER_COOKIE).ok_or_else(not_authorized)?;

        match resolve_identity(state, &token).await {
            Some(Identity::User(user_id)) => {
                set_sentry_user(&user_id, None);
                Ok(Self(user_id))
            }
            _ => Err(not_authorized()),
        }
    }
}

/// Extractor that requires the seller.
///
/// The token's subject must still match the configured seller email, so
/// rotating `SELLER_EMAIL` invalidates outstanding seller sessions.
#[derive(Debug, Clone, Copy)]
pub struct RequireSeller;

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = read_cookie(&parts.headers, SELLER_COOKIE).ok_or_else(not_authorized)?;

        match resolve_identity(state, &token).await {
            Some(Identity::Seller { email }) if email == state.config().seller.email.as_str() => {
                Ok(Self)
            }
            _ => Err(not_authorized()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; token=abc.def"));
        headers.append(COOKIE, HeaderValue::from_static("sellerToken=xyz"));

        assert_eq!(read_cookie(&headers, USER_COOKIE).as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, SELLER_COOKIE).as_deref(), Some("xyz"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token="));
        assert_eq!(read_cookie(&headers, USER_COOKIE), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let value = session_cookie(USER_COOKIE, "abc".to_owned(), false).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("token=abc"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Strict"));
        assert!(value.contains("Max-Age=604800"));
        assert!(!value.contains("Secure"));

        let secure = session_cookie(SELLER_COOKIE, "xyz".to_owned(), true).unwrap();
        let secure = secure.to_str().unwrap();
        assert!(secure.contains("Secure"));
        assert!(secure.contains("SameSite=None"));
    }

    #[test]
    fn test_removal_cookie_expires() {
        let value = removal_cookie(USER_COOKIE, false).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("token="));
        assert!(value.contains("Max-Age=0"));
    }
}
