//! Payment processor client.
//!
//! The processor is an opaque third party: the storefront hands it the
//! intent's client secret plus the payment method collected by the payment
//! UI, and gets back success or a decline. Anything that is not an explicit
//! success is treated as a decline by the checkout flow.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::PaymentProcessorConfig;

/// Errors that can occur when calling the payment processor.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Processor returned an error response.
    #[error("Processor error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Payment method input collected by the payment UI.
///
/// Opaque to the storefront: the UI tokenizes card details with the
/// processor's publishable key and only the resulting token travels here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Tokenized payment method.
    pub payment_method: String,
}

/// Outcome of a payment-method confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorOutcome {
    /// The charge went through.
    Succeeded,
    /// The processor declined the payment method.
    Declined {
        /// Processor-supplied reason, surfaced to the shopper.
        reason: String,
    },
}

/// Interface to the payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Confirm a payment method against a payment intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor cannot be reached or answers with
    /// an error response. Callers treat any error as a decline.
    async fn confirm_payment_method(
        &self,
        client_secret: &str,
        details: &PaymentDetails,
    ) -> Result<ProcessorOutcome, ProcessorError>;
}

/// HTTP client for the payment processor API.
#[derive(Clone)]
pub struct ProcessorClient {
    client: reqwest::Client,
    base_url: String,
}

impl ProcessorClient {
    /// Create a new processor client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &PaymentProcessorConfig) -> Result<Self, ProcessorError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| ProcessorError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

/// Confirmation response from the processor.
#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    status: String,
    #[serde(default)]
    decline_reason: Option<String>,
}

#[async_trait]
impl PaymentProcessor for ProcessorClient {
    #[instrument(skip(self, client_secret, details))]
    async fn confirm_payment_method(
        &self,
        client_secret: &str,
        details: &PaymentDetails,
    ) -> Result<ProcessorOutcome, ProcessorError> {
        let url = format!("{}/v1/payment_intents/confirm", self.base_url);

        let body = serde_json::json!({
            "client_secret": client_secret,
            "payment_method": details.payment_method,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProcessorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let confirmation: ConfirmResponse = response
            .json()
            .await
            .map_err(|e| ProcessorError::Parse(e.to_string()))?;

        if confirmation.status == "succeeded" {
            Ok(ProcessorOutcome::Succeeded)
        } else {
            Ok(ProcessorOutcome::Declined {
                reason: confirmation
                    .decline_reason
                    .unwrap_or_else(|| format!("payment {}", confirmation.status)),
            })
        }
    }
}
