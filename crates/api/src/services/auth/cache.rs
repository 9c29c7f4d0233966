//! Verified-token cache.
//!
//! Decoding a JWT on every request is cheap but not free. Verified
//! identities are cached for up to five minutes, keyed by a SHA-256 digest
//! of the token so raw tokens never sit in memory longer than the request
//! that carried them. An entry never outlives the token's own `exp`.
//!
//! The cache is process-local: a logout on one instance does not evict the
//! entry on another until it expires.

use std::time::Duration;

use moka::future::Cache;
use sha2::{Digest, Sha256};

use super::token::{Identity, VerifiedToken};

/// Cached identity lifetime.
pub const TOKEN_CACHE_TTL: Duration = Duration::from_secs(300);

/// Maximum number of cached identities.
pub const TOKEN_CACHE_CAPACITY: u64 = 1000;

/// Bounded, TTL-limited cache of verified identities.
#[derive(Clone)]
pub struct TokenCache {
    inner: Cache<String, VerifiedToken>,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(TOKEN_CACHE_CAPACITY, TOKEN_CACHE_TTL)
    }
}

impl TokenCache {
    /// Create a cache with explicit bounds.
    #[must_use]
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Look up a previously verified token that is still unexpired at `now`
    /// (Unix seconds). Expired entries are dropped.
    pub async fn get(&self, token: &str, now: u64) -> Option<Identity> {
        let key = cache_key(token);
        let verified = self.inner.get(&key).await?;
        if now >= verified.expires_at {
            self.inner.invalidate(&key).await;
            return None;
        }
        Some(verified.identity)
    }

    /// Remember a verified token.
    pub async fn insert(&self, token: &str, verified: VerifiedToken) {
        self.inner.insert(cache_key(token), verified).await;
    }

    /// Forget a token (logout).
    pub async fn invalidate(&self, token: &str) {
        self.inner.invalidate(&cache_key(token)).await;
    }
}

fn cache_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshcart_core::UserId;

    const NOW: u64 = 1_700_000_000;

    fn verified(user: i32, expires_at: u64) -> VerifiedToken {
        VerifiedToken {
            identity: Identity::User(UserId::new(user)),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_insert_get_invalidate() {
        let cache = TokenCache::default();

        assert_eq!(cache.get("tok", NOW).await, None);
        cache.insert("tok", verified(7, NOW + 60)).await;
        assert_eq!(
            cache.get("tok", NOW).await,
            Some(Identity::User(UserId::new(7)))
        );

        cache.invalidate("tok").await;
        assert_eq!(cache.get("tok", NOW).await, None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = TokenCache::new(10, Duration::from_millis(50));
        cache.insert("tok", verified(1, NOW + 60)).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get("tok", NOW).await, None);
    }

    #[tokio::test]
    async fn test_entry_not_served_past_token_expiry() {
        let cache = TokenCache::default();
        cache.insert("tok", verified(1, NOW + 10)).await;

        assert!(cache.get("tok", NOW + 9).await.is_some());
        assert_eq!(cache.get("tok", NOW + 10).await, None);
        // dropped, not just hidden
        assert_eq!(cache.get("tok", NOW).await, None);
    }

    #[test]
    fn test_cache_key_is_digest() {
        let key = cache_key("abc");
        assert_eq!(key.len(), 64);
        assert_ne!(key, "abc");
    }
}
