//! Catalog handlers.
//!
//! Listing and lookup are public. Adding, stock changes and removal require
//! the seller.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State, multipart::MultipartRejection};
use serde::{Deserialize, Serialize};

use freshcart_core::ProductId;

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::middleware::RequireSeller;
use crate::models::{NewProduct, Product};
use crate::response::ApiResponse;
use crate::services::catalog::CatalogService;
use crate::state::AppState;

use super::{JsonBody, parse_id};

/// Multipart field holding the product JSON.
const PRODUCT_DATA_FIELD: &str = "productData";

#[derive(Debug, Serialize)]
pub struct ProductsPayload {
    pub products: Arc<Vec<Product>>,
}

#[derive(Debug, Serialize)]
pub struct ProductPayload {
    pub product: Product,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRequest {
    pub id: ProductId,
    pub in_stock: bool,
}

/// `GET /api/product/list`
pub async fn list(
    State(state): State<AppState>,
) -> Result<ApiResponse<ProductsPayload>, AppError> {
    let products = CatalogService::new(state.pool(), state.product_cache())
        .list()
        .await?;
    Ok(ApiResponse::ok(ProductsPayload { products }))
}

/// `GET /api/product/category/{category}`
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<ApiResponse<ProductsPayload>, AppError> {
    let products = CatalogService::new(state.pool(), state.product_cache())
        .list_by_category(&category)
        .await?;
    Ok(ApiResponse::ok(ProductsPayload { products }))
}

/// `GET /api/product/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ProductPayload>, AppError> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = CatalogService::new(state.pool(), state.product_cache())
        .get(id)
        .await
        .map_err(|err| match err {
            RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
            other => AppError::Database(other),
        })?;
    Ok(ApiResponse::ok(ProductPayload { product }))
}

/// `POST /api/product/add`
///
/// Expects a multipart body whose `productData` field is the product JSON.
pub async fn add(
    State(state): State<AppState>,
    _seller: RequireSeller,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<ProductPayload>, AppError> {
    let mut multipart = multipart.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let mut product_data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(PRODUCT_DATA_FIELD) {
            product_data = Some(
                field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?,
            );
            break;
        }
    }

    let raw = product_data
        .ok_or_else(|| AppError::BadRequest(format!("{PRODUCT_DATA_FIELD} is required")))?;
    let product: NewProduct = serde_json::from_str(&raw)
        .map_err(|e| AppError::BadRequest(format!("Invalid {PRODUCT_DATA_FIELD}: {e}")))?;
    let product = product.validate()?;

    let product = CatalogService::new(state.pool(), state.product_cache())
        .add(&product)
        .await?;

    Ok(ApiResponse::ok(ProductPayload { product }).with_message("Product Added"))
}

/// `PUT /api/product/stock`
pub async fn set_stock(
    State(state): State<AppState>,
    _seller: RequireSeller,
    JsonBody(body): JsonBody<StockRequest>,
) -> Result<ApiResponse<ProductPayload>, AppError> {
    let product = CatalogService::new(state.pool(), state.product_cache())
        .set_stock(body.id, body.in_stock)
        .await?;
    Ok(ApiResponse::ok(ProductPayload { product }).with_message("Stock Updated"))
}

/// `DELETE /api/product/remove/{id}`
pub async fn remove(
    State(state): State<AppState>,
    _seller: RequireSeller,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let id: ProductId = parse_id(&id, "product")?;
    CatalogService::new(state.pool(), state.product_cache())
        .remove(id)
        .await?;
    Ok(ApiResponse::message("Product Removed"))
}
