//! Orders and their populated listing view.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;

use freshcart_core::{
    AddressId, LineItem, OrderId, OrderStatus, PaymentType, ProductId, UserId,
};

use super::address::Address;
use super::product::{Product, ProductSummary};

/// A placed order (domain type).
///
/// `items` and `amount` are frozen at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub amount: Decimal,
    pub address_id: AddressId,
    pub status: OrderStatus,
    pub payment_type: PaymentType,
    pub is_paid: bool,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Raw `orders` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderRow {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Json<Vec<LineItem>>,
    pub amount: Decimal,
    pub address_id: AddressId,
    pub status: OrderStatus,
    pub payment_type: PaymentType,
    pub is_paid: bool,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            amount: row.amount,
            address_id: row.address_id,
            status: row.status,
            payment_type: row.payment_type,
            is_paid: row.is_paid,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
        }
    }
}

/// One order line with its product populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub product: ProductSummary,
    pub quantity: u32,
    /// Unit price frozen at purchase time.
    pub price: Decimal,
}

/// An order as returned by the listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderLineView>,
    pub amount: Decimal,
    pub address: Option<Address>,
    pub status: OrderStatus,
    pub payment_type: PaymentType,
    pub is_paid: bool,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Product IDs referenced by this order's lines.
    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.items.iter().map(|item| item.product)
    }

    /// Whether this order belongs in a listing: cash on delivery, or paid.
    #[must_use]
    pub fn is_listable(&self) -> bool {
        self.payment_type == PaymentType::CashOnDelivery || self.is_paid
    }

    /// Populate products and address for display.
    ///
    /// Lines whose product has since been deleted are dropped. Returns `None`
    /// when no line survives.
    #[must_use]
    pub fn populate<S: std::hash::BuildHasher>(
        self,
        products: &HashMap<ProductId, Product, S>,
        address: Option<Address>,
    ) -> Option<OrderView> {
        let items: Vec<OrderLineView> = self
            .items
            .iter()
            .filter_map(|item| {
                products.get(&item.product).map(|product| OrderLineView {
                    product: ProductSummary::from(product),
                    quantity: item.quantity,
                    price: item.price,
                })
            })
            .collect();

        if items.is_empty() {
            return None;
        }

        Some(OrderView {
            id: self.id,
            user_id: self.user_id,
            items,
            amount: self.amount,
            address,
            status: self.status,
            payment_type: self.payment_type,
            is_paid: self.is_paid,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: vec![],
            price: Some(Decimal::from(10)),
            offer_price: None,
            images: vec![],
            category: "Pantry".to_owned(),
            in_stock: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn order(items: &[(i32, u32)], payment_type: PaymentType, is_paid: bool) -> Order {
        Order {
            id: OrderId::new(1),
            user_id: UserId::new(3),
            items: items
                .iter()
                .map(|&(product, quantity)| LineItem {
                    product: ProductId::new(product),
                    quantity,
                    price: Decimal::from(10),
                })
                .collect(),
            amount: Decimal::from(23),
            address_id: AddressId::new(4),
            status: OrderStatus::OrderPlaced,
            payment_type,
            is_paid,
            shipped_at: None,
            delivered_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_listable_orders() {
        assert!(order(&[(1, 1)], PaymentType::CashOnDelivery, false).is_listable());
        assert!(order(&[(1, 1)], PaymentType::Online, true).is_listable());
        assert!(!order(&[(1, 1)], PaymentType::Online, false).is_listable());
    }

    #[test]
    fn test_populate_drops_deleted_products() {
        let products = HashMap::from([(ProductId::new(1), product(1))]);
        let view = order(&[(1, 2), (2, 1)], PaymentType::CashOnDelivery, false)
            .populate(&products, None)
            .unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product.name, "Product 1");
        assert_eq!(view.items[0].quantity, 2);
        // Frozen amount is kept even though a line was dropped from display.
        assert_eq!(view.amount, Decimal::from(23));
    }

    #[test]
    fn test_populate_omits_order_without_surviving_lines() {
        let products: HashMap<ProductId, Product> = HashMap::new();
        assert!(
            order(&[(7, 1)], PaymentType::CashOnDelivery, false)
                .populate(&products, None)
                .is_none()
        );
    }
}
