//! Catalog route handlers.
//!
//! Thin proxies over the backend catalog; responses are the backend's
//! shapes, served from the API client's cache when warm.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::api::types::{Category, Product};
use crate::error::Result;
use crate::state::AppState;

/// Category filter query parameters.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: String,
}

/// List all products.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.api().get_products().await?))
}

/// List products in a category.
#[instrument(skip(state))]
pub async fn by_category(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(
        state.api().get_products_by_category(&query.category).await?,
    ))
}

/// Show a single product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    Ok(Json(state.api().get_product_by_slug(&slug).await?))
}

/// List all categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.api().get_categories().await?))
}
