//! Seed the catalog from a YAML file.
//!
//! The file is a list of products in the same shape the seller dashboard
//! submits:
//!
//! ```yaml
//! - name: Organic Bananas
//!   category: Fruits
//!   price: 4.99
//!   offerPrice: 3.99
//!   description: ["Sweet and ripe", "Sold by the bunch"]
//!   images: ["https://cdn.freshcart.test/bananas.jpg"]
//! ```
//!
//! Every entry is validated before the database is touched.

use std::path::Path;

use tracing::{error, info};

use freshcart_api::db;
use freshcart_api::db::products::ProductRepository;
use freshcart_api::models::NewProduct;

use super::database_url;

/// Parse and validate a catalog file's contents.
///
/// Returns the validated products, or one message per invalid entry.
fn parse_catalog(content: &str) -> Result<Vec<NewProduct>, Vec<String>> {
    let raw: Vec<NewProduct> =
        serde_yaml::from_str(content).map_err(|e| vec![format!("invalid YAML: {e}")])?;

    let mut products = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();
    for (index, product) in raw.into_iter().enumerate() {
        let label = if product.name.trim().is_empty() {
            format!("entry {}", index + 1)
        } else {
            product.name.trim().to_owned()
        };
        match product.validate() {
            Ok(product) => products.push(product),
            Err(e) => errors.push(format!("{label}: {e}")),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Insert the products listed in `file_path`.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing, the file can't be read or
/// fails validation, or an insert fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;

    let products = match parse_catalog(&content) {
        Ok(products) => products,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(products = products.len(), "Catalog validated");

    let pool = db::create_pool(&database_url).await?;
    let repo = ProductRepository::new(&pool);

    for product in &products {
        let created = repo.create(product).await?;
        info!(product_id = %created.id, name = %created.name, "Inserted product");
    }

    info!(inserted = products.len(), "Seeding complete");
    Ok(())
}
