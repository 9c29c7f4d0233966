//! Product catalog with a read-through listing cache.
//!
//! Listings (all products, per category) are cached in `moka` for five
//! minutes. Any seller mutation clears the whole cache; catalog writes are
//! rare compared with storefront reads.
//!
//! Each clear bumps a generation counter. A listing read from the database
//! is only kept if no clear happened since the read started, so a slow read
//! cannot put a pre-mutation listing back into the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::instrument;

use freshcart_core::ProductId;

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::models::product::{NewProduct, Product};

/// Cache key for product listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum ListingKey {
    All,
    Category(String),
}

/// Bounded, TTL-limited cache of product listings.
#[derive(Clone)]
pub struct ProductCache {
    inner: Cache<ListingKey, Arc<Vec<Product>>>,
    generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for ProductCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCache")
            .field("entries", &self.inner.entry_count())
            .field("generation", &self.generation())
            .finish()
    }
}

impl Default for ProductCache {
    fn default() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(300)) // 5 minutes
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl ProductCache {
    /// Drop every cached listing and start a new generation.
    pub async fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &ListingKey) -> Option<Arc<Vec<Product>>> {
        self.inner.get(key).await
    }

    /// Store a listing read during generation `seen`. Dropped if a clear
    /// happened in between, including one racing with this insert.
    async fn fill(&self, key: ListingKey, products: Arc<Vec<Product>>, seen: u64) {
        if self.generation() != seen {
            return;
        }
        self.inner.insert(key.clone(), products).await;
        if self.generation() != seen {
            self.inner.invalidate(&key).await;
        }
    }
}

/// Catalog operations for the storefront and the seller.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    cache: &'a ProductCache,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a ProductCache) -> Self {
        Self {
            products: ProductRepository::new(pool),
            cache,
        }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.cache.get(&ListingKey::All).await {
            return Ok(products);
        }

        let seen = self.cache.generation();
        let products = Arc::new(self.products.list().await?);
        self.cache
            .fill(ListingKey::All, Arc::clone(&products), seen)
            .await;
        Ok(products)
    }

    /// Products in a category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(
        &self,
        category: &str,
    ) -> Result<Arc<Vec<Product>>, RepositoryError> {
        let key = ListingKey::Category(category.trim().to_lowercase());
        if let Some(products) = self.cache.get(&key).await {
            return Ok(products);
        }

        let seen = self.cache.generation();
        let products = Arc::new(self.products.list_by_category(category.trim()).await?);
        self.cache.fill(key, Arc::clone(&products), seen).await;
        Ok(products)
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, RepositoryError> {
        self.products.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Add a validated product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let created = self.products.create(product).await?;
        self.cache.invalidate_all().await;
        tracing::info!(product_id = %created.id, "Product added");
        Ok(created)
    }

    /// Change a product's stock flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, in_stock: bool) -> Result<Product, RepositoryError> {
        let product = self.products.set_stock(id, in_stock).await?;
        self.cache.invalidate_all().await;
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.products.delete(id).await?;
        self.cache.invalidate_all().await;
        tracing::info!(product_id = %id, "Product removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_all_clears_listings() {
        let cache = ProductCache::default();
        cache
            .inner
            .insert(ListingKey::All, Arc::new(Vec::new()))
            .await;
        cache
            .inner
            .insert(ListingKey::Category("fruits".to_owned()), Arc::new(Vec::new()))
            .await;
        assert!(cache.inner.get(&ListingKey::All).await.is_some());

        cache.invalidate_all().await;
        assert!(cache.inner.get(&ListingKey::All).await.is_none());
        assert!(
            cache
                .inner
                .get(&ListingKey::Category("fruits".to_owned()))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_fill_from_before_invalidation_is_dropped() {
        let cache = ProductCache::default();
        let seen = cache.generation();

        // a seller mutation lands while the listing query is in flight
        cache.invalidate_all().await;
        cache.fill(ListingKey::All, Arc::new(Vec::new()), seen).await;

        assert!(cache.get(&ListingKey::All).await.is_none());
    }

    #[tokio::test]
    async fn test_fill_in_current_generation_is_kept() {
        let cache = ProductCache::default();
        cache.invalidate_all().await;

        let seen = cache.generation();
        cache.fill(ListingKey::All, Arc::new(Vec::new()), seen).await;

        assert!(cache.get(&ListingKey::All).await.is_some());
    }

    #[tokio::test]
    async fn test_clones_share_generation() {
        let cache = ProductCache::default();
        let other = cache.clone();
        let seen = cache.generation();

        other.invalidate_all().await;

        assert_ne!(cache.generation(), seen);
    }
}
