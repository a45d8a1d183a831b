//! The shopper's cart.
//!
//! [`Cart`] is the pure state: an insertion-ordered collection of lines
//! keyed by product ID, with decimal arithmetic for totals. [`CartStore`]
//! wraps it with the durable session slot: every mutation is persisted
//! before the store returns, and a missing or corrupt payload restores as
//! an empty cart rather than an error.
//!
//! The cart is the only state shared across pages, and it is only ever
//! mutated through [`CartStore`]. Nothing clears it except a confirmed
//! checkout success or an explicit shopper action.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use clementine_core::ProductId;

use crate::api::types::Product;
use crate::models::session_keys;

/// Errors that can occur when persisting the cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// The session slot could not be written.
    #[error("session storage error: {0}")]
    Storage(#[from] tower_sessions::session::Error),
}

/// One product currently selected for purchase.
///
/// `unit_price` and the display fields are snapshots captured when the line
/// was added; they are not re-read from the catalog, so the cart keeps
/// showing the price the shopper accepted even if the catalog changes
/// mid-session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub category_name: String,
    pub image_url: Option<String>,
    /// Unit price snapshot at add time. Unrounded.
    pub unit_price: Decimal,
    /// Always >= 1; a line that would reach 0 is removed instead.
    pub quantity: u32,
}

impl CartLine {
    /// Line subtotal (`unit_price` x `quantity`), unrounded.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The cart: insertion-ordered lines, one per product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// The cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `quantity` units of a product.
    ///
    /// If the product is already in the cart its quantity increases;
    /// otherwise a new line is appended with a snapshot of the product's
    /// current price and display fields. Adding zero units is a no-op.
    pub fn add_item(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }

        if let Some(line) = self.line_mut(product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            return;
        }

        self.lines.push(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            category_name: product.category_name.clone(),
            image_url: product.image.clone(),
            unit_price: product.price,
            quantity,
        });
    }

    /// Set a line's quantity exactly; 0 (or below, at the caller) removes it.
    ///
    /// Silently does nothing if the product is not in the cart - the UI may
    /// race a remove against a quantity click.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(product_id);
            return;
        }

        if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        }
    }

    /// Remove a line; no-op if the product is not in the cart.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `unit_price` x `quantity` over all lines.
    ///
    /// Unrounded; round to currency precision only when formatting for
    /// display.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Total number of units across all lines (not the number of lines).
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

/// Session-backed cart store.
///
/// The single writer for the shopper's cart: loads the cart from the
/// durable session slot, applies mutations through [`Cart`]'s operations,
/// and persists after every mutation before returning.
pub struct CartStore {
    session: Session,
    cart: Cart,
}

impl CartStore {
    /// Load the cart from the session.
    ///
    /// A missing, corrupt, or schema-mismatched payload restores as an
    /// empty cart; restoration never fails the request.
    #[instrument(skip(session))]
    pub async fn load(session: Session) -> Self {
        let cart = match session.get::<Cart>(session_keys::CART).await {
            Ok(Some(cart)) => cart,
            Ok(None) => Cart::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored cart could not be read, starting empty");
                Cart::default()
            }
        };

        Self { session, cart }
    }

    /// The current cart state.
    #[must_use]
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Add a product to the cart and persist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the session write fails.
    pub async fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        self.cart.add_item(product, quantity);
        self.persist().await
    }

    /// Update a line's quantity and persist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the session write fails.
    pub async fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.cart.update_quantity(product_id, quantity);
        self.persist().await
    }

    /// Remove a line and persist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the session write fails.
    pub async fn remove_item(&mut self, product_id: ProductId) -> Result<(), CartError> {
        self.cart.remove_item(product_id);
        self.persist().await
    }

    /// Empty the cart and persist the empty state.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the session write fails.
    pub async fn clear(&mut self) -> Result<(), CartError> {
        self.cart.clear();
        self.persist().await
    }

    async fn persist(&self) -> Result<(), CartError> {
        self.session.insert(session_keys::CART, &self.cart).await?;
        Ok(())
    }
}
