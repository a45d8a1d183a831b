//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures unexpected errors to
//! Sentry before responding. All route handlers return `Result<T, AppError>`,
//! and every error body is `{"error": message}` JSON - the contract the shop
//! pages read. Shopper-recoverable checkout errors keep their full message;
//! internal failures are replaced with a generic one.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::api::ApiError;
use crate::cart::CartError;
use crate::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart persistence failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// A checkout step failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Backend store API operation failed.
    #[error("Store API error: {0}")]
    Api(#[from] ApiError),

    /// Session read/write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated for this resource.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error should be captured to Sentry.
    fn is_unexpected(&self) -> bool {
        match self {
            Self::Cart(_) | Self::Session(_) | Self::Internal(_) => true,
            // A captured payment without a confirmed order needs support
            // follow-up; make sure it lands in error tracking.
            Self::Checkout(CheckoutError::ReconciliationRisk { .. }) => true,
            Self::Api(err) => matches!(err, ApiError::Http(_) | ApiError::Parse(_)),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Cart(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart
                | CheckoutError::MissingBillingField(_)
                | CheckoutError::InvalidState { .. }
                | CheckoutError::IntentRejected(_) => StatusCode::BAD_REQUEST,
                CheckoutError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
                CheckoutError::Network(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::ReconciliationRisk { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Api(err) => match err {
                ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                // Backend-reported client errors (bad credentials, admin
                // required) pass through with their status.
                ApiError::Api { status, .. } if (400..500).contains(status) => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
                }
                ApiError::Api { .. } | ApiError::Http(_) | ApiError::Parse(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            // Don't expose internal error details to clients
            Self::Cart(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Api(err) => match err {
                ApiError::NotFound(message) => message.clone(),
                ApiError::Api { status, message } if (400..500).contains(status) => {
                    message.clone()
                }
                ApiError::Api { .. } | ApiError::Http(_) | ApiError::Parse(_) => {
                    "Store backend error".to_string()
                }
            },
            // Checkout errors are written for the shopper; surface them.
            Self::Checkout(err) => err.to_string(),
            Self::NotFound(message) | Self::Unauthorized(message) | Self::BadRequest(message) => {
                message.clone()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_unexpected() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({ "error": self.message() });
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
