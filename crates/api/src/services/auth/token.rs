//! Signed session tokens (HS256 JWT).
//!
//! A token carries the subject and its role. Users get `sub = <user id>` and
//! `role = user`; the seller gets `sub = <seller email>` and `role = seller`.
//! Tokens expire after [`TOKEN_TTL`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use freshcart_core::UserId;

use super::AuthError;

/// Token lifetime (7 days). Also used as the cookie `Max-Age`.
pub const TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Who a verified token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A registered customer.
    User(UserId),
    /// The single configured seller.
    Seller { email: String },
}

/// A verified identity together with the token's `exp` (Unix seconds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub identity: Identity,
    pub expires_at: u64,
}

/// Current Unix time in seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    User,
    Seller,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    iat: u64,
    exp: u64,
}

/// Signing and verification keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys").finish_non_exhaustive()
    }
}

impl TokenKeys {
    /// Build keys from the shared secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Issue a token for `identity`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if the token cannot be encoded.
    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::InvalidToken)?
            .as_secs();

        let (sub, role) = match identity {
            Identity::User(id) => (id.to_string(), Role::User),
            Identity::Seller { email } => (email.clone(), Role::Seller),
        };

        let claims = Claims {
            sub,
            role,
            iat,
            exp: iat + TOKEN_TTL.as_secs(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenSigning)
    }

    /// Verify a token's signature and expiry and recover its identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any malformed, tampered or
    /// expired token.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify_token(token).map(|verified| verified.identity)
    }

    /// Like [`Self::verify`], also returning the token's expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any malformed, tampered or
    /// expired token.
    pub fn verify_token(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        let expires_at = data.claims.exp;

        let identity = match data.claims.role {
            Role::User => data
                .claims
                .sub
                .parse::<UserId>()
                .map(Identity::User)
                .map_err(|_| AuthError::InvalidToken),
            Role::Seller => Ok(Identity::Seller {
                email: data.claims.sub,
            }),
        }?;

        Ok(VerifiedToken {
            identity,
            expires_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&SecretString::from(secret))
    }

    #[test]
    fn test_user_token_round_trip() {
        let keys = keys("a-long-enough-secret-for-testing-tokens");
        let token = keys.issue(&Identity::User(UserId::new(42))).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), Identity::User(UserId::new(42)));
    }

    #[test]
    fn test_seller_token_carries_role() {
        let keys = keys("a-long-enough-secret-for-testing-tokens");
        let seller = Identity::Seller {
            email: "seller@freshcart.test".to_owned(),
        };
        let token = keys.issue(&seller).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), seller);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = keys("first-secret-first-secret-first-secret")
            .issue(&Identity::User(UserId::new(1)))
            .unwrap();
        let result = keys("second-secret-second-secret-second-sec").verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys("a-long-enough-secret-for-testing-tokens");
        let claims = Claims {
            sub: "1".to_owned(),
            role: Role::User,
            iat: 1_000,
            exp: 2_000,
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_verified_token_carries_expiry() {
        let keys = keys("a-long-enough-secret-for-testing-tokens");
        let before = unix_now();
        let token = keys.issue(&Identity::User(UserId::new(3))).unwrap();

        let verified = keys.verify_token(&token).unwrap();
        assert_eq!(verified.identity, Identity::User(UserId::new(3)));
        assert!(verified.expires_at >= before + TOKEN_TTL.as_secs());
    }

    #[test]
    fn test_garbage_rejected() {
        let keys = keys("a-long-enough-secret-for-testing-tokens");
        assert!(keys.verify("not.a.jwt").is_err());
        assert!(keys.verify("").is_err());
    }
}
