//! Cart route handlers.
//!
//! All mutations go through [`CartStore`], which persists to the session
//! slot before the response is sent. Responses are the JSON fragments the
//! shop pages render: the full cart view, or just the count badge.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use clementine_core::{CurrencyCode, Price, ProductId};

use crate::cart::{Cart, CartStore};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub category_name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub count: u32,
}

/// Cart count badge data.
#[derive(Debug, Clone, Serialize)]
pub struct CartCountView {
    pub count: u32,
}

/// Format a decimal amount as a display price.
///
/// The only place cart amounts are rounded.
fn format_price(amount: Decimal) -> String {
    Price::new(amount, CurrencyCode::USD).display()
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    category_name: line.category_name.clone(),
                    image_url: line.image_url.clone(),
                    quantity: line.quantity,
                    unit_price: format_price(line.unit_price),
                    line_total: format_price(line.subtotal()),
                })
                .collect(),
            subtotal: format_price(cart.total()),
            count: cart.count(),
        }
    }
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update quantity request.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
}

/// Get the cart contents.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Json<CartView> {
    let store = CartStore::load(session).await;
    Json(CartView::from(store.cart()))
}

/// Add a product to the cart.
///
/// Looks the product up in the catalog so the line snapshots the current
/// price and display fields.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartCountView>> {
    let product = state.api().find_product(request.product_id).await?;
    if !product.available {
        return Err(AppError::BadRequest(format!(
            "{} is no longer available",
            product.name
        )));
    }

    let mut store = CartStore::load(session).await;
    store
        .add_item(&product, request.quantity.unwrap_or(1))
        .await?;

    Ok(Json(CartCountView {
        count: store.cart().count(),
    }))
}

/// Set a line's quantity; 0 removes the line.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let mut store = CartStore::load(session).await;
    store
        .update_quantity(request.product_id, request.quantity)
        .await?;

    Ok(Json(CartView::from(store.cart())))
}

/// Remove a line from the cart.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    let mut store = CartStore::load(session).await;
    store.remove_item(request.product_id).await?;

    Ok(Json(CartView::from(store.cart())))
}

/// Get the cart count badge.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Json<CartCountView> {
    let store = CartStore::load(session).await;
    Json(CartCountView {
        count: store.cart().count(),
    })
}
