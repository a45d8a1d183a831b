//! Wire types for the backend store API.
//!
//! Field names and shapes follow the backend's JSON exactly; decimal amounts
//! arrive as strings and deserialize into `rust_decimal::Decimal`. The
//! dashboard aggregates are pre-converted to floats by the backend and are
//! kept as `f64` - they are display-only and never enter cart arithmetic.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clementine_core::{CategoryId, OrderId, ProductId};

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Current catalog price. The cart snapshots this at add time.
    pub price: Decimal,
    pub category: CategoryId,
    pub category_name: String,
    pub image: Option<String>,
    pub stock: i64,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Response from the payment-intent creation endpoint.
///
/// The backend uses camelCase for this one response because the payment UI
/// consumes it directly.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentResponse {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// Response from the backend login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminLogin {
    pub token: String,
    pub username: String,
    pub is_staff: bool,
}

/// An order line as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i64,
}

/// An order as returned by the backend (recent-orders listing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: Option<i64>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub total_amount: Decimal,
    pub status: String,
    pub paid: bool,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dashboard statistics payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub summary: StatsSummary,
    pub orders_by_status: Vec<StatusCount>,
    pub top_products: Vec<TopProduct>,
    pub daily_revenue: Vec<DailyRevenue>,
    pub low_stock_products: Vec<LowStockProduct>,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_revenue: f64,
    pub total_orders: i64,
    pub paid_orders: i64,
    pub total_products: i64,
    pub available_products: i64,
    pub avg_order_value: f64,
    pub recent_orders: i64,
    pub recent_revenue: f64,
}

/// Order count per status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Top-selling product row.
///
/// The double-underscore names come from the backend's aggregation query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopProduct {
    #[serde(rename = "product__name")]
    pub name: String,
    #[serde(rename = "product__price")]
    pub price: f64,
    pub total_quantity: i64,
    pub total_revenue: Option<f64>,
}

/// Revenue for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: f64,
    pub orders: i64,
}

/// Product running low on stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub stock: i64,
    pub price: f64,
}

/// A list body that may or may not be paginated.
///
/// The backend returns either a plain array or a `{count, results: []}` page
/// depending on endpoint configuration; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MaybePaginated<T> {
    Paginated { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> MaybePaginated<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Paginated { results } => results,
            Self::Plain(items) => items,
        }
    }
}
