//! The checkout state machine.
//!
//! One [`CheckoutSession`] is created per checkout attempt and persisted in
//! the shopper's session between requests; [`CheckoutOrchestrator`] drives
//! it through:
//!
//! ```text
//! Collecting -> IntentCreated -> AwaitingPaymentMethod -> Confirming
//!                                        ^                    |
//!                                        +---- decline -------+
//!                                                             v
//!                                              Succeeded | Failed
//! ```
//!
//! The line items and total are snapshotted from the cart when billing is
//! submitted; later cart mutations never affect an in-flight checkout, so
//! what the processor authorizes is exactly what the backend bills. The
//! orchestrator never touches the cart itself - the checkout route clears
//! it once, on a confirmed success.

mod error;

pub use error::CheckoutError;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use clementine_core::{OrderId, ProductId};

use crate::api::ApiError;
use crate::cart::Cart;
use crate::processor::{PaymentDetails, PaymentProcessor, ProcessorOutcome};

/// Where a checkout attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Billing details are being collected; nothing sent yet.
    Collecting,
    /// The backend created the payment intent and the pending order.
    IntentCreated,
    /// The payment UI is mounted and waiting for a payment method.
    AwaitingPaymentMethod,
    /// A processor confirmation is in flight.
    Confirming,
    /// Terminal: order confirmed, cart cleared.
    Succeeded,
    /// Terminal: unrecoverable for this attempt.
    Failed,
}

/// Shopper-entered billing details.
///
/// All fields are required; only presence is checked here. Format
/// validation (email shape, phone digits) is the form's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl BillingDetails {
    /// Check that every field is present (non-blank).
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingBillingField` naming the first blank
    /// field.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let fields: [(&'static str, &str); 8] = [
            ("email", &self.email),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
            ("phone", &self.phone),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(CheckoutError::MissingBillingField(name));
            }
        }

        Ok(())
    }
}

/// One line of the checkout's immutable cart snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A payment intent created by the backend.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// The pending order created alongside the intent.
    pub order_id: OrderId,
    /// Opaque credential handed to the payment UI.
    pub client_secret: String,
}

/// What the receipt view gets on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub order_id: OrderId,
    /// The snapshot total the shopper was charged. Unrounded.
    pub total: Decimal,
}

/// State of one checkout attempt.
///
/// Serialized into the session between requests; destroyed when a terminal
/// state is reached or the shopper cancels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub status: CheckoutStatus,
    /// Preserved across retryable failures so the form stays filled.
    pub billing: Option<BillingDetails>,
    /// Immutable snapshot of the cart, taken at billing submission.
    pub lines: Vec<LineItem>,
    /// Snapshot total matching `lines`. Unrounded.
    pub total: Decimal,
    /// Assigned by the backend once the intent exists.
    pub order_id: Option<OrderId>,
    /// Opaque credential for the payment UI; present from `IntentCreated`.
    pub payment_intent_secret: Option<String>,
}

impl CheckoutSession {
    /// Begin a checkout attempt.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines; no
    /// session is created and no network call is made.
    pub fn begin(cart: &Cart) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        Ok(Self {
            status: CheckoutStatus::Collecting,
            billing: None,
            lines: Vec::new(),
            total: Decimal::ZERO,
            order_id: None,
            payment_intent_secret: None,
        })
    }
}

/// The two backend calls a checkout makes.
///
/// A seam so the orchestrator can be exercised against in-memory fakes.
#[async_trait]
pub trait OrdersBackend: Send + Sync {
    /// Create a payment intent (and the pending order) for a cart snapshot.
    async fn create_payment_intent(
        &self,
        billing: &BillingDetails,
        items: &[LineItem],
    ) -> Result<PaymentIntent, ApiError>;

    /// Confirm a paid order. Called exactly once per successful charge.
    async fn confirm_payment(&self, order_id: OrderId) -> Result<(), ApiError>;
}

/// Drives a [`CheckoutSession`] through the checkout protocol.
///
/// Short-lived: constructed per request from the application's backend and
/// processor clients.
pub struct CheckoutOrchestrator<'a, B, P> {
    backend: &'a B,
    processor: &'a P,
}

impl<'a, B, P> CheckoutOrchestrator<'a, B, P>
where
    B: OrdersBackend,
    P: PaymentProcessor,
{
    /// Create an orchestrator over the given collaborators.
    pub const fn new(backend: &'a B, processor: &'a P) -> Self {
        Self { backend, processor }
    }

    /// Submit billing details: snapshot the cart and create the payment
    /// intent.
    ///
    /// On success the checkout moves to `IntentCreated` and the backend's
    /// order ID is returned.
    ///
    /// # Errors
    ///
    /// - `MissingBillingField`: a field was blank; nothing was sent and the
    ///   checkout stays at `Collecting`.
    /// - `EmptyCart`: the cart emptied since the checkout began.
    /// - `Network`: the backend was unreachable; the checkout stays at
    ///   `Collecting` with billing preserved, and can be resubmitted.
    /// - `IntentRejected`: the backend refused the cart (message verbatim);
    ///   the checkout is `Failed` and must be restarted.
    #[instrument(skip_all)]
    pub async fn submit_billing(
        &self,
        checkout: &mut CheckoutSession,
        cart: &Cart,
        billing: BillingDetails,
    ) -> Result<OrderId, CheckoutError> {
        if checkout.status != CheckoutStatus::Collecting {
            return Err(CheckoutError::InvalidState {
                expected: "billing",
            });
        }

        billing.validate()?;

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Snapshot before the call: later cart mutations must not leak into
        // this attempt, and a transport failure retries the same snapshot.
        checkout.lines = cart
            .lines()
            .iter()
            .map(|line| LineItem {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect();
        checkout.total = cart.total();

        let result = self
            .backend
            .create_payment_intent(&billing, &checkout.lines)
            .await;
        checkout.billing = Some(billing);

        match result {
            Ok(intent) => {
                checkout.order_id = Some(intent.order_id);
                checkout.payment_intent_secret = Some(intent.client_secret);
                checkout.status = CheckoutStatus::IntentCreated;
                Ok(intent.order_id)
            }
            Err(ApiError::Api { message, .. }) => {
                checkout.status = CheckoutStatus::Failed;
                Err(CheckoutError::IntentRejected(message))
            }
            Err(e) => Err(CheckoutError::Network(e)),
        }
    }

    /// Mount the payment-method form: hand out the intent secret.
    ///
    /// Idempotent across page reloads: re-mounting while already at
    /// `AwaitingPaymentMethod` returns the same secret.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if no intent has been created.
    #[instrument(skip_all)]
    pub fn mount_payment_form(
        &self,
        checkout: &mut CheckoutSession,
    ) -> Result<String, CheckoutError> {
        if !matches!(
            checkout.status,
            CheckoutStatus::IntentCreated | CheckoutStatus::AwaitingPaymentMethod
        ) {
            return Err(CheckoutError::InvalidState {
                expected: "payment",
            });
        }

        let secret = checkout
            .payment_intent_secret
            .clone()
            .ok_or(CheckoutError::InvalidState {
                expected: "payment",
            })?;

        checkout.status = CheckoutStatus::AwaitingPaymentMethod;
        Ok(secret)
    }

    /// Submit a payment method: confirm with the processor, then confirm
    /// the order with the backend.
    ///
    /// # Errors
    ///
    /// - `Declined`: the processor did not accept the method (decline or
    ///   unreachable processor); the checkout returns to
    ///   `AwaitingPaymentMethod` with the intent retained, so another
    ///   method can be tried without a new intent.
    /// - `ReconciliationRisk`: the charge was captured but the backend
    ///   confirmation failed; the checkout is terminally `Failed` and is
    ///   never retried here.
    #[instrument(skip_all)]
    pub async fn submit_payment_method(
        &self,
        checkout: &mut CheckoutSession,
        details: &PaymentDetails,
    ) -> Result<Receipt, CheckoutError> {
        if checkout.status != CheckoutStatus::AwaitingPaymentMethod {
            return Err(CheckoutError::InvalidState {
                expected: "payment",
            });
        }

        let (order_id, secret) = match (checkout.order_id, checkout.payment_intent_secret.clone())
        {
            (Some(order_id), Some(secret)) => (order_id, secret),
            _ => {
                return Err(CheckoutError::InvalidState {
                    expected: "payment",
                });
            }
        };

        checkout.status = CheckoutStatus::Confirming;

        match self.processor.confirm_payment_method(&secret, details).await {
            Ok(ProcessorOutcome::Succeeded) => {}
            Ok(ProcessorOutcome::Declined { reason }) => {
                checkout.status = CheckoutStatus::AwaitingPaymentMethod;
                return Err(CheckoutError::Declined(reason));
            }
            Err(e) => {
                // Any non-success from the processor is a decline; the
                // intent stays valid for another attempt.
                checkout.status = CheckoutStatus::AwaitingPaymentMethod;
                return Err(CheckoutError::Declined(e.to_string()));
            }
        }

        // The charge is captured. Exactly one backend confirmation, keyed
        // by order_id; a failure here must surface loudly, not retry.
        match self.backend.confirm_payment(order_id).await {
            Ok(()) => {
                checkout.status = CheckoutStatus::Succeeded;
                Ok(Receipt {
                    order_id,
                    total: checkout.total,
                })
            }
            Err(e) => {
                checkout.status = CheckoutStatus::Failed;
                tracing::error!(
                    %order_id,
                    error = %e,
                    "payment captured but order confirmation failed"
                );
                Err(CheckoutError::ReconciliationRisk { order_id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;
    use rust_decimal::dec;

    use clementine_core::{CategoryId, ProductId};

    use crate::api::types::Product;
    use crate::processor::ProcessorError;

    fn product(id: i64, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            price,
            category: CategoryId::new(1),
            category_name: "Office".to_string(),
            image: None,
            stock: 100,
            available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn billing() -> BillingDetails {
        BillingDetails {
            email: "shopper@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Quinn".to_string(),
            address: "1 High Street".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    /// Backend fake: counts calls, returns configured results.
    struct FakeBackend {
        intent_result: Mutex<Option<Result<PaymentIntent, ApiError>>>,
        confirm_result: Mutex<Option<Result<(), ApiError>>>,
        intent_calls: AtomicU32,
        confirm_calls: AtomicU32,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                intent_result: Mutex::new(Some(Ok(PaymentIntent {
                    order_id: OrderId::new(42),
                    client_secret: "pi_42_secret".to_string(),
                }))),
                confirm_result: Mutex::new(Some(Ok(()))),
                intent_calls: AtomicU32::new(0),
                confirm_calls: AtomicU32::new(0),
            }
        }

        fn with_intent_error(err: ApiError) -> Self {
            let backend = Self::new();
            *backend.intent_result.lock().expect("lock") = Some(Err(err));
            backend
        }

        fn with_confirm_error(err: ApiError) -> Self {
            let backend = Self::new();
            *backend.confirm_result.lock().expect("lock") = Some(Err(err));
            backend
        }
    }

    #[async_trait]
    impl OrdersBackend for FakeBackend {
        async fn create_payment_intent(
            &self,
            _billing: &BillingDetails,
            _items: &[LineItem],
        ) -> Result<PaymentIntent, ApiError> {
            self.intent_calls.fetch_add(1, Ordering::SeqCst);
            self.intent_result
                .lock()
                .expect("lock")
                .take()
                .unwrap_or(Ok(PaymentIntent {
                    order_id: OrderId::new(42),
                    client_secret: "pi_42_secret".to_string(),
                }))
        }

        async fn confirm_payment(&self, _order_id: OrderId) -> Result<(), ApiError> {
            self.confirm_calls.fetch_add(1, Ordering::SeqCst);
            self.confirm_result
                .lock()
                .expect("lock")
                .take()
                .unwrap_or(Ok(()))
        }
    }

    /// Processor fake returning a fixed outcome.
    struct FakeProcessor {
        outcome: Mutex<Option<Result<ProcessorOutcome, ProcessorError>>>,
        calls: AtomicU32,
    }

    impl FakeProcessor {
        fn succeeding() -> Self {
            Self {
                outcome: Mutex::new(Some(Ok(ProcessorOutcome::Succeeded))),
                calls: AtomicU32::new(0),
            }
        }

        fn declining(reason: &str) -> Self {
            Self {
                outcome: Mutex::new(Some(Ok(ProcessorOutcome::Declined {
                    reason: reason.to_string(),
                }))),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentProcessor for FakeProcessor {
        async fn confirm_payment_method(
            &self,
            _client_secret: &str,
            _details: &PaymentDetails,
        ) -> Result<ProcessorOutcome, ProcessorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .lock()
                .expect("lock")
                .take()
                .unwrap_or(Ok(ProcessorOutcome::Succeeded))
        }
    }

    fn cart_with(entries: &[(i64, Decimal, u32)]) -> Cart {
        let mut cart = Cart::default();
        for &(id, price, quantity) in entries {
            cart.add_item(&product(id, price), quantity);
        }
        cart
    }

    #[test]
    fn test_begin_rejects_empty_cart() {
        let err = CheckoutSession::begin(&Cart::default()).expect_err("must reject");
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[test]
    fn test_begin_starts_collecting() {
        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let checkout = CheckoutSession::begin(&cart).expect("begin");
        assert_eq!(checkout.status, CheckoutStatus::Collecting);
        assert!(checkout.order_id.is_none());
        assert!(checkout.payment_intent_secret.is_none());
    }

    #[tokio::test]
    async fn test_blank_billing_field_blocks_before_any_network_call() {
        let backend = FakeBackend::new();
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");

        let mut bad = billing();
        bad.postal_code = "  ".to_string();

        let err = orchestrator
            .submit_billing(&mut checkout, &cart, bad)
            .await
            .expect_err("must reject");

        assert!(matches!(
            err,
            CheckoutError::MissingBillingField("postal_code")
        ));
        assert_eq!(checkout.status, CheckoutStatus::Collecting);
        assert_eq!(backend.intent_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_billing_snapshots_cart_and_creates_intent() {
        let backend = FakeBackend::new();
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");

        let order_id = orchestrator
            .submit_billing(&mut checkout, &cart, billing())
            .await
            .expect("intent created");

        assert_eq!(order_id, OrderId::new(42));
        assert_eq!(checkout.status, CheckoutStatus::IntentCreated);
        assert_eq!(checkout.total, dec!(39.98));
        assert_eq!(checkout.lines.len(), 1);
        assert_eq!(checkout.lines[0].quantity, 2);
        assert_eq!(
            checkout.payment_intent_secret.as_deref(),
            Some("pi_42_secret")
        );
    }

    #[tokio::test]
    async fn test_snapshot_isolated_from_later_cart_mutations() {
        let backend = FakeBackend::new();
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let mut cart = cart_with(&[(1, dec!(10.00), 1)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");

        orchestrator
            .submit_billing(&mut checkout, &cart, billing())
            .await
            .expect("intent created");

        // The live cart changes while the checkout is in flight.
        cart.update_quantity(ProductId::new(1), 5);
        assert_eq!(cart.total(), dec!(50.00));

        assert_eq!(checkout.total, dec!(10.00));
        assert_eq!(checkout.lines, vec![LineItem {
            product_id: ProductId::new(1),
            quantity: 1,
        }]);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_collecting_with_billing_preserved() {
        // reqwest errors cannot be constructed directly; a Parse error
        // exercises the same non-Api arm.
        let parse_err = serde_json::from_str::<serde_json::Value>("not json")
            .expect_err("must fail to parse");
        let backend = FakeBackend::with_intent_error(ApiError::Parse(parse_err));
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");

        let err = orchestrator
            .submit_billing(&mut checkout, &cart, billing())
            .await
            .expect_err("network error");

        assert!(matches!(err, CheckoutError::Network(_)));
        assert_eq!(checkout.status, CheckoutStatus::Collecting);
        assert!(checkout.billing.is_some(), "billing preserved for retry");
    }

    #[tokio::test]
    async fn test_backend_rejection_is_terminal_and_verbatim() {
        let backend = FakeBackend::with_intent_error(ApiError::Api {
            status: 400,
            message: "Insufficient stock for Product 1".to_string(),
        });
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");

        let err = orchestrator
            .submit_billing(&mut checkout, &cart, billing())
            .await
            .expect_err("rejected");

        assert_eq!(err.to_string(), "Insufficient stock for Product 1");
        assert_eq!(checkout.status, CheckoutStatus::Failed);
    }

    #[tokio::test]
    async fn test_mount_payment_form_is_reload_safe() {
        let backend = FakeBackend::new();
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");
        orchestrator
            .submit_billing(&mut checkout, &cart, billing())
            .await
            .expect("intent created");

        let first = orchestrator
            .mount_payment_form(&mut checkout)
            .expect("mounted");
        assert_eq!(checkout.status, CheckoutStatus::AwaitingPaymentMethod);

        // Page reload mounts the form again.
        let second = orchestrator
            .mount_payment_form(&mut checkout)
            .expect("remounted");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_mount_payment_form_requires_intent() {
        let backend = FakeBackend::new();
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");

        let err = orchestrator
            .mount_payment_form(&mut checkout)
            .expect_err("no intent yet");
        assert!(matches!(err, CheckoutError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_successful_payment_confirms_backend_exactly_once() {
        let backend = FakeBackend::new();
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");
        orchestrator
            .submit_billing(&mut checkout, &cart, billing())
            .await
            .expect("intent created");
        orchestrator
            .mount_payment_form(&mut checkout)
            .expect("mounted");

        let receipt = orchestrator
            .submit_payment_method(&mut checkout, &PaymentDetails {
                payment_method: "pm_tok_visa".to_string(),
            })
            .await
            .expect("payment succeeded");

        assert_eq!(checkout.status, CheckoutStatus::Succeeded);
        assert_eq!(receipt.order_id, OrderId::new(42));
        assert_eq!(receipt.total, dec!(39.98));
        assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decline_returns_to_awaiting_with_intent_retained() {
        let backend = FakeBackend::new();
        let processor = FakeProcessor::declining("insufficient_funds");
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");
        orchestrator
            .submit_billing(&mut checkout, &cart, billing())
            .await
            .expect("intent created");
        orchestrator
            .mount_payment_form(&mut checkout)
            .expect("mounted");

        let err = orchestrator
            .submit_payment_method(&mut checkout, &PaymentDetails {
                payment_method: "pm_tok_bad".to_string(),
            })
            .await
            .expect_err("declined");

        assert!(matches!(err, CheckoutError::Declined(_)));
        assert_eq!(checkout.status, CheckoutStatus::AwaitingPaymentMethod);
        // Intent is retained: no second intent creation, no backend confirm.
        assert_eq!(checkout.order_id, Some(OrderId::new(42)));
        assert!(checkout.payment_intent_secret.is_some());
        assert_eq!(backend.intent_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirmation_failure_after_capture_is_reconciliation_risk() {
        let backend = FakeBackend::with_confirm_error(ApiError::Api {
            status: 500,
            message: "database unavailable".to_string(),
        });
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");
        orchestrator
            .submit_billing(&mut checkout, &cart, billing())
            .await
            .expect("intent created");
        orchestrator
            .mount_payment_form(&mut checkout)
            .expect("mounted");

        let err = orchestrator
            .submit_payment_method(&mut checkout, &PaymentDetails {
                payment_method: "pm_tok_visa".to_string(),
            })
            .await
            .expect_err("reconciliation risk");

        assert!(matches!(
            err,
            CheckoutError::ReconciliationRisk {
                order_id
            } if order_id == OrderId::new(42)
        ));
        assert_eq!(checkout.status, CheckoutStatus::Failed);
        // Exactly one confirmation attempt; never retried blindly.
        assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_payment_requires_awaiting_state() {
        let backend = FakeBackend::new();
        let processor = FakeProcessor::succeeding();
        let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");

        let err = orchestrator
            .submit_payment_method(&mut checkout, &PaymentDetails {
                payment_method: "pm_tok_visa".to_string(),
            })
            .await
            .expect_err("wrong state");

        assert!(matches!(err, CheckoutError::InvalidState { .. }));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_checkout_session_serde_roundtrip() {
        let cart = cart_with(&[(1, dec!(19.99), 2)]);
        let mut checkout = CheckoutSession::begin(&cart).expect("begin");
        checkout.order_id = Some(OrderId::new(42));
        checkout.payment_intent_secret = Some("pi_42_secret".to_string());
        checkout.status = CheckoutStatus::AwaitingPaymentMethod;

        let json = serde_json::to_string(&checkout).expect("serialize");
        let restored: CheckoutSession = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.status, CheckoutStatus::AwaitingPaymentMethod);
        assert_eq!(restored.order_id, Some(OrderId::new(42)));
    }
}
