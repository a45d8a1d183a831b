//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::api::StoreApiClient;
use crate::config::StorefrontConfig;
use crate::processor::{ProcessorClient, ProcessorError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend API client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    api: StoreApiClient,
    processor: ProcessorClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment processor client cannot be built
    /// (malformed secret key).
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, ProcessorError> {
        let api = StoreApiClient::new(&config.store_api);
        let processor = ProcessorClient::new(&config.payment)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                api,
                processor,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the backend store API client.
    #[must_use]
    pub fn api(&self) -> &StoreApiClient {
        &self.inner.api
    }

    /// Get a reference to the payment processor client.
    #[must_use]
    pub fn processor(&self) -> &ProcessorClient {
        &self.inner.processor
    }
}
