//! Cart totals and order pricing.
//!
//! Both the cart badge total and the checkout amount are computed from the
//! effective unit price (offer price when set, otherwise the regular price).
//! Checkout additionally freezes a per-line price snapshot and adds tax:
//!
//! ```text
//! amount = floor(subtotal) + floor(subtotal * 0.15)
//! ```

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{MAX_AMOUNT, ProductId, ProductPrice};

/// Sales tax rate applied at checkout (15%).
pub const TAX_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// A customer's cart: product ID to quantity.
pub type CartItems = BTreeMap<ProductId, u32>;

/// Result of totalling a cart against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotal {
    /// Sum of effective unit price times quantity.
    pub total: Decimal,
    /// Products in the cart that no longer exist in the catalog.
    pub unknown_products: Vec<ProductId>,
}

/// Total a cart.
///
/// Entries with a zero quantity contribute nothing. Products missing from
/// `prices` are skipped and reported in [`CartTotal::unknown_products`]
/// rather than failing the whole computation.
#[must_use]
pub fn cart_total<S: std::hash::BuildHasher>(
    cart: &CartItems,
    prices: &HashMap<ProductId, ProductPrice, S>,
) -> CartTotal {
    let mut total = Decimal::ZERO;
    let mut unknown_products = Vec::new();

    for (&product, &quantity) in cart {
        if quantity == 0 {
            continue;
        }
        match prices.get(&product) {
            Some(price) => total += price.effective() * Decimal::from(quantity),
            None => unknown_products.push(product),
        }
    }

    CartTotal {
        total,
        unknown_products,
    }
}

/// Drop zero-quantity entries from a cart before it is stored.
#[must_use]
pub fn normalize_cart(cart: CartItems) -> CartItems {
    cart.into_iter().filter(|&(_, qty)| qty > 0).collect()
}

// =============================================================================
// Order pricing
// =============================================================================

/// One requested line of an order, as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderLineRequest {
    /// Product being ordered.
    pub product: ProductId,
    /// Number of units.
    pub quantity: u32,
}

/// Catalog facts needed to price one product at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogPrice {
    /// Validated pricing.
    pub price: ProductPrice,
    /// Whether the product can currently be sold.
    pub in_stock: bool,
}

/// A frozen line item: what was bought, how many, and at what unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LineItem {
    /// Product bought.
    pub product: ProductId,
    /// Number of units.
    pub quantity: u32,
    /// Effective unit price at the time of purchase.
    pub price: Decimal,
}

impl LineItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Subtotal, tax and the tax-inclusive amount of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    /// Sum of all line totals.
    pub subtotal: Decimal,
    /// `floor(subtotal * TAX_RATE)`.
    pub tax: Decimal,
    /// `floor(subtotal) + tax`; frozen on the order row.
    pub amount: Decimal,
}

impl OrderTotals {
    /// Compute tax and amount from a subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let tax = (subtotal * TAX_RATE).floor();
        Self {
            subtotal,
            tax,
            amount: subtotal.floor() + tax,
        }
    }
}

/// A fully priced order ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    /// Frozen line items, in request order.
    pub items: Vec<LineItem>,
    /// Totals derived from `items`.
    pub totals: OrderTotals,
}

/// Reasons an order cannot be priced. Any of these rejects the whole order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// No lines were requested.
    #[error("order must contain at least one item")]
    Empty,
    /// A line asked for zero units.
    #[error("quantity for product {0} must be greater than zero")]
    InvalidQuantity(ProductId),
    /// A line references a product that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
    /// A line references a product that is out of stock.
    #[error("product {0} is out of stock")]
    OutOfStock(ProductId),
    /// The order total is more than a single order can hold.
    #[error("order total cannot exceed {MAX_AMOUNT}")]
    AmountTooLarge,
}

/// Price an order against a catalog snapshot.
///
/// Repeated products are merged into a single line. Every product must exist
/// and be in stock, and the tax-inclusive amount must not exceed
/// [`MAX_AMOUNT`].
///
/// # Errors
///
/// Returns the first [`PricingError`] encountered; no partial result is
/// produced.
pub fn price_order<S: std::hash::BuildHasher>(
    lines: &[OrderLineRequest],
    catalog: &HashMap<ProductId, CatalogPrice, S>,
) -> Result<PricedOrder, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::Empty);
    }

    let mut items: Vec<LineItem> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(PricingError::InvalidQuantity(line.product));
        }
        let entry = catalog
            .get(&line.product)
            .ok_or(PricingError::ProductNotFound(line.product))?;
        if !entry.in_stock {
            return Err(PricingError::OutOfStock(line.product));
        }

        if let Some(existing) = items.iter_mut().find(|i| i.product == line.product) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            items.push(LineItem {
                product: line.product,
                quantity: line.quantity,
                price: entry.price.effective(),
            });
        }
    }

    let subtotal: Decimal = items.iter().map(LineItem::line_total).sum();
    let totals = OrderTotals::from_subtotal(subtotal);
    if totals.amount > MAX_AMOUNT {
        return Err(PricingError::AmountTooLarge);
    }

    Ok(PricedOrder { items, totals })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn catalog() -> HashMap<ProductId, CatalogPrice> {
        HashMap::from([
            (
                ProductId::new(5),
                CatalogPrice {
                    price: ProductPrice::new(Some(d(10)), Some(d(8))).unwrap(),
                    in_stock: true,
                },
            ),
            (
                ProductId::new(9),
                CatalogPrice {
                    price: ProductPrice::new(Some(d(20)), None).unwrap(),
                    in_stock: true,
                },
            ),
            (
                ProductId::new(11),
                CatalogPrice {
                    price: ProductPrice::new(Some(d(3)), None).unwrap(),
                    in_stock: false,
                },
            ),
        ])
    }

    fn line(product: i32, quantity: u32) -> OrderLineRequest {
        OrderLineRequest {
            product: ProductId::new(product),
            quantity,
        }
    }

    #[test]
    fn test_tax_rate_is_fifteen_percent() {
        assert_eq!(TAX_RATE.to_string(), "0.15");
    }

    #[test]
    fn test_reference_checkout() {
        let priced = price_order(&[line(5, 2), line(9, 1)], &catalog()).unwrap();
        assert_eq!(priced.totals.subtotal, d(36));
        assert_eq!(priced.totals.tax, d(5));
        assert_eq!(priced.totals.amount, d(41));
        assert_eq!(priced.items[0].price, d(8));
        assert_eq!(priced.items[1].price, d(20));
    }

    #[test]
    fn test_fractional_subtotal_floors_both_parts() {
        let totals = OrderTotals::from_subtotal(Decimal::new(1999, 2)); // 19.99
        assert_eq!(totals.tax, d(2)); // floor(2.9985)
        assert_eq!(totals.amount, d(21)); // floor(19.99) + 2
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let priced = price_order(&[line(9, 1), line(5, 1), line(9, 2)], &catalog()).unwrap();
        assert_eq!(priced.items.len(), 2);
        assert_eq!(priced.items[0].product, ProductId::new(9));
        assert_eq!(priced.items[0].quantity, 3);
        assert_eq!(priced.totals.subtotal, d(68));
    }

    #[test]
    fn test_missing_product_rejects_whole_order() {
        assert_eq!(
            price_order(&[line(5, 1), line(404, 1)], &catalog()),
            Err(PricingError::ProductNotFound(ProductId::new(404)))
        );
    }

    #[test]
    fn test_out_of_stock_rejects_whole_order() {
        assert_eq!(
            price_order(&[line(11, 1), line(5, 1)], &catalog()),
            Err(PricingError::OutOfStock(ProductId::new(11)))
        );
    }

    #[test]
    fn test_empty_and_zero_quantity_rejected() {
        assert_eq!(price_order(&[], &catalog()), Err(PricingError::Empty));
        assert_eq!(
            price_order(&[line(5, 0)], &catalog()),
            Err(PricingError::InvalidQuantity(ProductId::new(5)))
        );
    }

    #[test]
    fn test_order_amount_above_limit_rejected() {
        let catalog = HashMap::from([(
            ProductId::new(1),
            CatalogPrice {
                price: ProductPrice::new(Some(d(100)), None).unwrap(),
                in_stock: true,
            },
        )]);
        assert_eq!(
            price_order(&[line(1, 2_000_000)], &catalog),
            Err(PricingError::AmountTooLarge)
        );
        assert_eq!(
            price_order(&[line(1, u32::MAX), line(1, u32::MAX)], &catalog),
            Err(PricingError::AmountTooLarge)
        );

        // 869,565 * 100 = 86,956,500 subtotal, amount 99,999,975 still fits.
        let priced = price_order(&[line(1, 869_565)], &catalog).unwrap();
        assert_eq!(priced.totals.amount, d(99_999_975));
    }

    #[test]
    fn test_cart_total_skips_unknown_and_zero() {
        let prices: HashMap<ProductId, ProductPrice> = catalog()
            .into_iter()
            .map(|(id, entry)| (id, entry.price))
            .collect();
        let cart = CartItems::from([
            (ProductId::new(5), 2),
            (ProductId::new(9), 1),
            (ProductId::new(11), 0),
            (ProductId::new(77), 4),
        ]);

        let total = cart_total(&cart, &prices);
        assert_eq!(total.total, d(36));
        assert_eq!(total.unknown_products, vec![ProductId::new(77)]);
    }

    #[test]
    fn test_normalize_cart_drops_zero_quantities() {
        let cart = CartItems::from([(ProductId::new(1), 0), (ProductId::new(2), 3)]);
        let cart = normalize_cart(cart);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(&ProductId::new(2)), Some(&3));
    }
}
