//! Pricing and order-status rules shared by the API and the CLI.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;

use rust_decimal::Decimal;

use freshcart_core::{
    CartItems, CatalogPrice, OrderLineRequest, OrderStatus, OrderTotals, PricingError, ProductId,
    ProductPrice, ProductPriceError, cart_total, price_order,
};

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
            ProductId::new(12),
            CatalogPrice {
                price: ProductPrice::new(Some(d(4)), None).unwrap(),
                in_stock: false,
            },
        ),
    ])
}

#[test]
fn test_cart_and_checkout_agree_on_reference_scenario() {
    let cart = CartItems::from([(ProductId::new(5), 2), (ProductId::new(9), 1)]);
    let prices: HashMap<_, _> = catalog().into_iter().map(|(id, c)| (id, c.price)).collect();
    assert_eq!(cart_total(&cart, &prices).total, d(36));

    let lines: Vec<OrderLineRequest> = cart
        .iter()
        .map(|(&product, &quantity)| OrderLineRequest { product, quantity })
        .collect();
    let priced = price_order(&lines, &catalog()).unwrap();

    assert_eq!(priced.totals.subtotal, d(36));
    assert_eq!(priced.totals.tax, d(5));
    assert_eq!(priced.totals.amount, d(41));
}

#[test]
fn test_amount_is_floor_subtotal_plus_floor_tax() {
    for (subtotal, expected) in [
        (Decimal::new(999, 2), d(10)),   // 9 + floor(1.4985)
        (Decimal::new(650, 2), d(6)),    // 6 + floor(0.975)
        (Decimal::new(10_000, 2), d(115)),
    ] {
        let totals = OrderTotals::from_subtotal(subtotal);
        assert_eq!(
            totals.amount,
            subtotal.floor() + (subtotal * Decimal::new(15, 2)).floor()
        );
        assert_eq!(totals.amount, expected, "subtotal {subtotal}");
    }
}

#[test]
fn test_any_bad_line_rejects_the_order() {
    let good = OrderLineRequest {
        product: ProductId::new(5),
        quantity: 1,
    };
    let out_of_stock = OrderLineRequest {
        product: ProductId::new(12),
        quantity: 1,
    };
    let missing = OrderLineRequest {
        product: ProductId::new(999),
        quantity: 1,
    };

    assert_eq!(
        price_order(&[good, out_of_stock], &catalog()),
        Err(PricingError::OutOfStock(ProductId::new(12)))
    );
    assert_eq!(
        price_order(&[good, missing], &catalog()),
        Err(PricingError::ProductNotFound(ProductId::new(999)))
    );
}

#[test]
fn test_offer_price_never_exceeds_price() {
    assert!(matches!(
        ProductPrice::new(Some(d(5)), Some(d(6))),
        Err(ProductPriceError::OfferAbovePrice { .. })
    ));
    assert_eq!(
        ProductPrice::new(Some(d(5)), Some(d(5))).unwrap().effective(),
        d(5)
    );
}

#[test]
fn test_status_moves_forward_only() {
    use OrderStatus::{Cancelled, Delivered, OrderPlaced, Shipped};

    assert_eq!(OrderPlaced.transition_to(Shipped), Ok(Shipped));
    assert_eq!(Shipped.transition_to(Delivered), Ok(Delivered));
    assert_eq!(Shipped.transition_to(Cancelled), Ok(Cancelled));

    assert!(Shipped.transition_to(OrderPlaced).is_err());
    assert!(OrderPlaced.transition_to(Delivered).is_err());
    for terminal in [Delivered, Cancelled] {
        for next in OrderStatus::ALL {
            assert!(terminal.transition_to(next).is_err());
        }
    }
}

#[test]
fn test_status_labels_parse_back() {
    for status in OrderStatus::ALL {
        assert_eq!(status.label().parse::<OrderStatus>(), Ok(status));
    }
    assert!("shipped".parse::<OrderStatus>().is_err());
}
