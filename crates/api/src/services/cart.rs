//! Server-side cart persistence and totals.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use freshcart_core::{
    CartItems, CartTotal, ProductId, ProductPrice, UserId, cart_total, normalize_cart,
};

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;

/// A cart together with its current total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_items: CartItems,
    #[serde(flatten)]
    pub total: CartTotal,
}

/// Cart operations for a signed-in user.
pub struct CartService<'a> {
    users: UserRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Current cart and total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user no longer exists.
    pub async fn get(&self, user_id: UserId) -> Result<CartView, RepositoryError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.view(user.cart_items).await
    }

    /// Replace the cart wholesale. Zero-quantity entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user no longer exists.
    #[instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn replace(
        &self,
        user_id: UserId,
        cart: CartItems,
    ) -> Result<CartView, RepositoryError> {
        let cart = normalize_cart(cart);
        self.users.set_cart(user_id, &cart).await?;
        self.view(cart).await
    }

    async fn view(&self, cart: CartItems) -> Result<CartView, RepositoryError> {
        let ids: Vec<ProductId> = cart.keys().copied().collect();
        let mut prices: HashMap<ProductId, ProductPrice> = HashMap::with_capacity(ids.len());
        for product in self.products.get_many(&ids).await? {
            prices.insert(product.id, product.pricing()?);
        }

        let total = cart_total(&cart, &prices);
        if !total.unknown_products.is_empty() {
            tracing::warn!(
                unknown = ?total.unknown_products,
                "Cart references products that no longer exist"
            );
        }

        Ok(CartView {
            cart_items: cart,
            total,
        })
    }
}
