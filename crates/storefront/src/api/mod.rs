//! Backend store API client.
//!
//! A plain-REST client over `reqwest`. Catalog reads (products, categories)
//! are cached with `moka` for 5 minutes; order and dashboard calls always go
//! to the backend. Backend errors arrive as `{"error": message}` (or DRF's
//! `{"detail": message}`) bodies and are surfaced with their status code.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use clementine_core::{OrderId, ProductId};

use crate::checkout::{BillingDetails, LineItem, OrdersBackend, PaymentIntent};
use crate::config::StoreApiConfig;

use types::{
    AdminLogin, Category, DashboardStats, MaybePaginated, Order, PaymentIntentResponse, Product,
};

/// Errors that can occur when calling the backend store API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Cached catalog responses.
#[derive(Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Categories(Vec<Category>),
}

/// Client for the backend store API.
///
/// Provides access to the catalog, payment endpoints, dashboard analytics,
/// and admin auth. Catalog reads are cached for 5 minutes.
#[derive(Clone)]
pub struct StoreApiClient {
    inner: Arc<StoreApiClientInner>,
}

struct StoreApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: moka::future::Cache<String, CacheValue>,
}

impl StoreApiClient {
    /// Create a new store API client.
    #[must_use]
    pub fn new(config: &StoreApiConfig) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(StoreApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                cache,
            }),
        }
    }

    /// Execute a request and parse the JSON response.
    ///
    /// The body is read as text first so error diagnostics can include it.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(&response_text);
            debug!(status = %status, message = %message, "Store API returned error");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match serde_json::from_str(&response_text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse store API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.inner.base_url);
        self.execute(self.inner.client.get(&url)).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.inner.base_url);
        self.execute(self.inner.client.post(&url).json(body)).await
    }

    // =========================================================================
    // Catalog Methods (cached)
    // =========================================================================

    /// Get all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        let cache_key = "products".to_string();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let page: MaybePaginated<Product> = self.get_json("/store/products/").await?;
        let products = page.into_vec();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get products in a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category = %category_slug))]
    pub async fn get_products_by_category(
        &self,
        category_slug: &str,
    ) -> Result<Vec<Product>, ApiError> {
        let cache_key = format!("products:category:{category_slug}");

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category products");
            return Ok(products);
        }

        let path = format!(
            "/store/products/by_category/?category={}",
            urlencoding::encode(category_slug)
        );
        let page: MaybePaginated<Product> = self.get_json(&path).await?;
        let products = page.into_vec();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product, ApiError> {
        let cache_key = format!("product:{slug}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/store/products/{}/", urlencoding::encode(slug));
        let product: Product = match self.get_json(&path).await {
            Ok(product) => product,
            Err(ApiError::Api { status: 404, .. }) => {
                return Err(ApiError::NotFound(format!("Product not found: {slug}")));
            }
            Err(e) => return Err(e),
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Find a product by its ID in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no product has this ID.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn find_product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        let products = self.get_products().await?;
        products
            .into_iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {product_id}")))
    }

    /// Get all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        let cache_key = "categories".to_string();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let page: MaybePaginated<Category> = self.get_json("/store/categories/").await?;
        let categories = page.into_vec();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    // =========================================================================
    // Admin Auth Methods
    // =========================================================================

    /// Log in as an admin user.
    ///
    /// # Errors
    ///
    /// Returns an error with the backend's message on bad credentials or
    /// insufficient privileges.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AdminLogin, ApiError> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            username: &'a str,
            password: &'a str,
        }

        self.post_json("/auth/login/", &LoginRequest { username, password })
            .await
    }

    /// Revoke an admin token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let url = format!("{}/auth/logout/", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .header("Authorization", format!("Token {token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = extract_error_message(&response.text().await.unwrap_or_default());
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    // =========================================================================
    // Dashboard Methods (admin token required)
    // =========================================================================

    /// Get dashboard statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    #[instrument(skip(self, token))]
    pub async fn dashboard_stats(&self, token: &str) -> Result<DashboardStats, ApiError> {
        let url = format!("{}/dashboard/stats/", self.inner.base_url);
        self.execute(
            self.inner
                .client
                .get(&url)
                .header("Authorization", format!("Token {token}")),
        )
        .await
    }

    /// Get the most recent orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    #[instrument(skip(self, token))]
    pub async fn recent_orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        let url = format!("{}/dashboard/recent-orders/", self.inner.base_url);
        let page: MaybePaginated<Order> = self
            .execute(
                self.inner
                    .client
                    .get(&url)
                    .header("Authorization", format!("Token {token}")),
            )
            .await?;
        Ok(page.into_vec())
    }
}

// =============================================================================
// Checkout Backend
// =============================================================================

#[async_trait]
impl OrdersBackend for StoreApiClient {
    /// Create a payment intent (and the pending order behind it).
    #[instrument(skip(self, billing, items))]
    async fn create_payment_intent(
        &self,
        billing: &BillingDetails,
        items: &[LineItem],
    ) -> Result<PaymentIntent, ApiError> {
        #[derive(Serialize)]
        struct CreateIntentRequest<'a> {
            #[serde(flatten)]
            billing: &'a BillingDetails,
            items: &'a [LineItem],
        }

        let response: PaymentIntentResponse = self
            .post_json("/store/payment/create/", &CreateIntentRequest { billing, items })
            .await?;

        Ok(PaymentIntent {
            order_id: response.order_id,
            client_secret: response.client_secret,
        })
    }

    /// Confirm a paid order with the backend.
    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn confirm_payment(&self, order_id: OrderId) -> Result<(), ApiError> {
        let url = format!("{}/store/payment/confirm/{order_id}/", self.inner.base_url);
        let response = self.inner.client.post(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = extract_error_message(&response.text().await.unwrap_or_default());
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Pull a human-readable message out of an error body.
///
/// The backend uses `{"error": msg}`; DRF's own errors use `{"detail": msg}`.
/// Anything else is truncated raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail"] {
            if let Some(message) = value.get(key).and_then(serde_json::Value::as_str) {
                return message.to_string();
            }
        }
    }

    let truncated: String = body.chars().take(200).collect();
    if truncated.is_empty() {
        "(empty error body)".to_string()
    } else {
        truncated
    }
}
