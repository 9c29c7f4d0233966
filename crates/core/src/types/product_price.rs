//! Regular and offer pricing for a catalog product.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest money value the store can hold (`NUMERIC(10,2)`): 99,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Errors raised when a product's prices are inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductPriceError {
    /// Neither a regular nor an offer price was given.
    #[error("product must have a price or an offer price")]
    Missing,
    /// A price is negative.
    #[error("prices cannot be negative")]
    Negative,
    /// A price is above [`MAX_AMOUNT`].
    #[error("prices cannot exceed {MAX_AMOUNT}")]
    TooLarge,
    /// The offer price is higher than the regular price.
    #[error("offer price ({offer}) cannot exceed price ({price})")]
    OfferAbovePrice {
        /// Regular price.
        price: Decimal,
        /// Offer price.
        offer: Decimal,
    },
}

/// Validated product pricing.
///
/// At least one of the two prices is present, and the offer price never
/// exceeds the regular price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    price: Option<Decimal>,
    offer_price: Option<Decimal>,
}

impl ProductPrice {
    /// Validate and build a product price.
    ///
    /// # Errors
    ///
    /// Returns [`ProductPriceError`] when both prices are absent, when either
    /// is negative or above [`MAX_AMOUNT`], or when the offer exceeds the
    /// regular price.
    pub fn new(
        price: Option<Decimal>,
        offer_price: Option<Decimal>,
    ) -> Result<Self, ProductPriceError> {
        if price.is_none() && offer_price.is_none() {
            return Err(ProductPriceError::Missing);
        }
        let mut given = [price, offer_price].into_iter().flatten();
        if given.clone().any(|p| p < Decimal::ZERO) {
            return Err(ProductPriceError::Negative);
        }
        if given.any(|p| p > MAX_AMOUNT) {
            return Err(ProductPriceError::TooLarge);
        }
        if let (Some(price), Some(offer)) = (price, offer_price)
            && offer > price
        {
            return Err(ProductPriceError::OfferAbovePrice { price, offer });
        }

        Ok(Self { price, offer_price })
    }

    /// Regular price, if set.
    #[must_use]
    pub const fn price(&self) -> Option<Decimal> {
        self.price
    }

    /// Offer (discounted) price, if set.
    #[must_use]
    pub const fn offer_price(&self) -> Option<Decimal> {
        self.offer_price
    }

    /// The price a customer pays per unit: the offer price when present,
    /// otherwise the regular price.
    #[must_use]
    pub fn effective(&self) -> Decimal {
        self.offer_price.or(self.price).unwrap_or(Decimal::ZERO)
    }
}
