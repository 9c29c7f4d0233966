//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use freshcart_core::{ProductId, ProductPrice, ProductPriceError};

use crate::db::RepositoryError;

/// A catalog product as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Description, one entry per bullet line.
    pub description: Vec<String>,
    pub price: Option<Decimal>,
    pub offer_price: Option<Decimal>,
    /// Already-hosted image URLs.
    pub images: Vec<String>,
    pub category: String,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Validated pricing for this product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored prices violate
    /// the pricing rules (the table constraints should make this impossible).
    pub fn pricing(&self) -> Result<ProductPrice, RepositoryError> {
        ProductPrice::new(self.price, self.offer_price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {} has invalid prices: {e}", self.id))
        })
    }
}

/// The subset of a product shown inside an order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub images: Vec<String>,
    pub price: Option<Decimal>,
    pub offer_price: Option<Decimal>,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            images: product.images.clone(),
            price: product.price,
            offer_price: product.offer_price,
        }
    }
}

/// Product validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("product category is required")]
    MissingCategory,
    #[error("invalid image URL: {0}")]
    InvalidImage(String),
    #[error(transparent)]
    Price(#[from] ProductPriceError),
}

/// Product fields submitted by the seller (`productData` form field).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub offer_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

impl NewProduct {
    /// Normalize and validate a new product.
    ///
    /// Blank description lines are dropped. Image URLs must be absolute
    /// `http`/`https` URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError`] for a blank name or category, a malformed
    /// image URL, or inconsistent prices.
    pub fn validate(mut self) -> Result<Self, ProductError> {
        self.name = self.name.trim().to_owned();
        if self.name.is_empty() {
            return Err(ProductError::MissingName);
        }
        self.category = self.category.trim().to_owned();
        if self.category.is_empty() {
            return Err(ProductError::MissingCategory);
        }

        self.description = self
            .description
            .into_iter()
            .map(|line| line.trim().to_owned())
            .filter(|line| !line.is_empty())
            .collect();

        for image in &self.images {
            let valid = Url::parse(image)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(ProductError::InvalidImage(image.clone()));
            }
        }

        ProductPrice::new(self.price, self.offer_price)?;
        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> NewProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_new_product_defaults() {
        let product = parse(serde_json::json!({
            "name": "Basmati Rice 5kg",
            "category": "Grains",
            "price": 12.5
        }))
        .validate()
        .unwrap();

        assert!(product.in_stock);
        assert!(product.images.is_empty());
        assert_eq!(product.price, Some(Decimal::new(125, 1)));
    }

    #[test]
    fn test_description_blank_lines_dropped() {
        let product = parse(serde_json::json!({
            "name": "Oat Milk",
            "category": "Dairy",
            "offerPrice": 3,
            "description": ["Barista blend", "  ", " 1L carton "]
        }))
        .validate()
        .unwrap();

        assert_eq!(product.description, vec!["Barista blend", "1L carton"]);
    }

    #[test]
    fn test_offer_above_price_rejected() {
        let err = parse(serde_json::json!({
            "name": "Apples",
            "category": "Fruits",
            "price": 4,
            "offerPrice": 5
        }))
        .validate()
        .unwrap_err();

        assert!(matches!(
            err,
            ProductError::Price(ProductPriceError::OfferAbovePrice { .. })
        ));
    }

    #[test]
    fn test_price_beyond_storable_range_rejected() {
        let err = parse(serde_json::json!({
            "name": "Gold Apples",
            "category": "Fruits",
            "price": 1_000_000_000
        }))
        .validate()
        .unwrap_err();

        assert_eq!(err, ProductError::Price(ProductPriceError::TooLarge));
    }

    #[test]
    fn test_blank_name_and_bad_image_rejected() {
        let err = parse(serde_json::json!({ "name": " ", "category": "x", "price": 1 }))
            .validate()
            .unwrap_err();
        assert_eq!(err, ProductError::MissingName);

        let err = parse(serde_json::json!({
            "name": "Pears",
            "category": "Fruits",
            "price": 2,
            "images": ["ftp://cdn.example.com/pear.png"]
        }))
        .validate()
        .unwrap_err();
        assert!(matches!(err, ProductError::InvalidImage(_)));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let product = Product {
            id: ProductId::new(5),
            name: "Mango".to_owned(),
            description: vec![],
            price: Some(Decimal::from(10)),
            offer_price: Some(Decimal::from(8)),
            images: vec!["https://cdn.example.com/mango.png".to_owned()],
            category: "Fruits".to_owned(),
            in_stock: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(ProductSummary::from(&product)).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["offerPrice"], 8.0);
        assert_eq!(product.pricing().unwrap().effective(), Decimal::from(8));
    }
}
