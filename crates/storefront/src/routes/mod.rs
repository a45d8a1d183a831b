//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Catalog (proxied, cached)
//! GET  /products               - Product listing
//! GET  /products/by-category   - Products in a category (?category=slug)
//! GET  /products/{slug}        - Product detail
//! GET  /categories             - Category listing
//!
//! # Cart
//! GET  /cart                   - Cart contents
//! POST /cart/add               - Add a product (returns count badge)
//! POST /cart/update            - Set a line's quantity
//! POST /cart/remove            - Remove a line
//! GET  /cart/count             - Cart count badge
//!
//! # Checkout
//! POST /checkout/start         - Begin a checkout attempt
//! POST /checkout/billing       - Submit billing, create payment intent
//! GET  /checkout/payment       - Mount the payment form (intent secret)
//! POST /checkout/confirm       - Submit payment method, confirm order
//! POST /checkout/cancel        - Abandon the attempt (cart untouched)
//!
//! # Admin
//! POST /auth/login             - Admin login (backend token)
//! POST /auth/logout            - Admin logout
//! GET  /dashboard/stats        - Dashboard statistics
//! GET  /dashboard/recent-orders - Recent orders
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod dashboard;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/by-category", get(products::by_category))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(products::categories))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(checkout::start))
        .route("/billing", post(checkout::billing))
        .route("/payment", get(checkout::payment))
        .route("/confirm", post(checkout::confirm))
        .route("/cancel", post(checkout::cancel))
}

/// Create the admin auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard::stats))
        .route("/recent-orders", get(dashboard::recent_orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog routes
        .merge(catalog_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout routes
        .nest("/checkout", checkout_routes())
        // Admin auth routes
        .nest("/auth", auth_routes())
        // Dashboard routes
        .nest("/dashboard", dashboard_routes())
}
