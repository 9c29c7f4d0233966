//! Order repository.
//!
//! Placement runs in a single transaction: the referenced products are read
//! with `FOR SHARE` row locks, priced, and the order row with its frozen
//! snapshot is inserted before the locks are released. A concurrent stock
//! change therefore cannot slip between the stock check and the insert.

use std::collections::HashMap;

use sqlx::PgPool;
use sqlx::types::Json;
use thiserror::Error;

use freshcart_core::{
    AddressId, CatalogPrice, OrderId, OrderLineRequest, OrderStatus, PaymentType, PricedOrder,
    PricingError, ProductId, UserId, price_order,
};

use super::RepositoryError;
use super::products::PRODUCT_COLUMNS;
use crate::models::order::{Order, OrderRow};
use crate::models::product::Product;

const ORDER_COLUMNS: &str = "id, user_id, items, amount, address_id, status, payment_type, \
                             is_paid, shipped_at, delivered_at, created_at";

/// Reasons an order could not be placed.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The address does not exist or belongs to someone else.
    #[error("address not found")]
    AddressNotFound,

    /// A line could not be priced; nothing was written.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Price and insert an order atomically.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::AddressNotFound` if the address isn't the user's,
    /// `PlaceOrderError::Pricing` if any product is missing or out of stock,
    /// and `PlaceOrderError::Repository` for database failures.
    pub async fn place(
        &self,
        user_id: UserId,
        address_id: AddressId,
        lines: &[OrderLineRequest],
        payment_type: PaymentType,
    ) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        let owns_address: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM addresses WHERE id = $1 AND user_id = $2)",
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if !owns_address {
            return Err(PlaceOrderError::AddressNotFound);
        }

        let ids: Vec<i32> = lines.iter().map(|l| l.product.as_i32()).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR SHARE"
        ))
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut catalog: HashMap<ProductId, CatalogPrice> = HashMap::with_capacity(products.len());
        for product in &products {
            catalog.insert(
                product.id,
                CatalogPrice {
                    price: product.pricing()?,
                    in_stock: product.in_stock,
                },
            );
        }

        let PricedOrder { items, totals } = price_order(lines, &catalog)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders (user_id, items, amount, address_id, payment_type) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(Json(&items))
        .bind(totals.amount)
        .bind(address_id)
        .bind(payment_type)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Order::from(row))
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// A user's listable orders (COD or paid), newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE user_id = $1 AND (payment_type = 'COD' OR is_paid) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Every listable order (COD or paid), newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE payment_type = 'COD' OR is_paid \
             ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Move an order from `from` to `to`, stamping `shipped_at`/`delivered_at`.
    ///
    /// The update only applies while the order is still in `from`, so two
    /// concurrent status changes cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the status changed underneath us.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $3, \
                 shipped_at = CASE WHEN $4 THEN NOW() ELSE shipped_at END, \
                 delivered_at = CASE WHEN $5 THEN NOW() ELSE delivered_at END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(to == OrderStatus::Shipped)
        .bind(to == OrderStatus::Delivered)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::from).ok_or_else(|| {
            RepositoryError::Conflict(format!("order {id} is no longer {from}"))
        })
    }

    /// Mark an online order paid and empty the owner's cart.
    ///
    /// Returns `false` when the order was already paid (or doesn't match), so
    /// duplicate webhook deliveries are harmless. A payment that succeeds after
    /// an earlier failed attempt reopens the soft-cancelled order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either update fails.
    pub async fn mark_paid(&self, id: OrderId, user_id: UserId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE orders SET is_paid = TRUE, \
                 status = CASE WHEN status = 'Cancelled' THEN 'Order Placed' ELSE status END, \
                 updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND payment_type = 'Online' AND NOT is_paid",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if updated {
            sqlx::query(
                "UPDATE users SET cart_items = '{}'::jsonb, updated_at = NOW() WHERE id = $1",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Soft-cancel an unpaid online order that has not progressed.
    ///
    /// Returns `false` if the order was already paid, cancelled or missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn cancel_unpaid(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'Cancelled', updated_at = NOW() \
             WHERE id = $1 AND payment_type = 'Online' AND NOT is_paid \
               AND status = 'Order Placed'",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remember the checkout session created for an online order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_checkout_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET checkout_session = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(session_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
