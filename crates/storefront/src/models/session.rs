//! Session-related types.
//!
//! Types stored in the session: the durable cart slot, in-flight checkout
//! state, and the admin identity for the dashboard.

use serde::{Deserialize, Serialize};

/// Session-stored admin identity.
///
/// Minimal data stored in the session to identify a logged-in admin; the
/// token is forwarded to the backend on dashboard requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSession {
    /// Backend-issued API token.
    pub token: String,
    /// Admin username, for display.
    pub username: String,
}

/// Session keys for storefront data.
pub mod keys {
    /// Key for the serialized cart (the durable cart slot).
    pub const CART: &str = "cart";

    /// Key for in-flight checkout state.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the logged-in admin identity.
    pub const ADMIN: &str = "admin";
}
