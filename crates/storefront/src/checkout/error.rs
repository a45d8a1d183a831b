//! Checkout error types.

use thiserror::Error;

use clementine_core::OrderId;

use crate::api::ApiError;

/// Errors that can occur while driving a checkout attempt.
///
/// The variants split along the recovery boundaries of the flow:
/// validation errors block a transition before any network call is made;
/// network errors are retryable from the state the checkout was already in;
/// declines return the flow to the payment-method step; and
/// [`CheckoutError::ReconciliationRisk`] is terminal and must never be
/// retried automatically.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout started (or continued) with an empty cart.
    #[error("your cart is empty")]
    EmptyCart,

    /// A required billing field was blank.
    #[error("missing required billing field: {0}")]
    MissingBillingField(&'static str),

    /// An operation arrived for a step the checkout is not at
    /// (e.g., submitting a payment method before an intent exists).
    #[error("checkout is not at the {expected} step")]
    InvalidState { expected: &'static str },

    /// The backend could not be reached; the step can be retried as-is.
    #[error("could not reach the store: {0}")]
    Network(#[source] ApiError),

    /// The backend refused to create a payment intent for this cart.
    /// The message is the backend's, verbatim.
    #[error("{0}")]
    IntentRejected(String),

    /// The processor declined the payment method; a different method can
    /// be submitted against the same intent.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The processor captured the payment but the backend confirmation
    /// failed. Retrying could double-bill; swallowing it could leave the
    /// order unfulfilled. Requires manual follow-up.
    #[error(
        "your payment was captured but the order could not be confirmed \
         (order {order_id}); please contact support before paying again"
    )]
    ReconciliationRisk { order_id: OrderId },
}
