//! Product listing and detail handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use tracing::instrument;

use sokoni_core::ProductId;

use crate::catalog::{Product, ShopFilter};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Number of related products shown on the detail page.
const RELATED_COUNT: usize = 3;

/// Product detail data with related products from the same category.
#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: Product,
    pub related: Vec<Product>,
}

/// Full product listing.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.catalog().all().to_vec())
}

/// Filtered shop listing.
#[instrument(skip(state))]
pub async fn shop(
    State(state): State<AppState>,
    Query(filter): Query<ShopFilter>,
) -> Json<Vec<Product>> {
    Json(
        state
            .catalog()
            .filter(&filter)
            .into_iter()
            .cloned()
            .collect(),
    )
}

/// Product detail with related products.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductDetailResponse>> {
    let id = ProductId::new(id);
    let catalog = state.catalog();
    let product = catalog
        .find_by_id(id)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ProductDetailResponse {
        product: product.clone(),
        related: catalog
            .related(product, RELATED_COUNT)
            .into_iter()
            .cloned()
            .collect(),
    }))
}
