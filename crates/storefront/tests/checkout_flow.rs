//! End-to-end checkout scenarios against in-memory collaborators.
//!
//! These exercise the full cart -> billing -> intent -> payment -> receipt
//! sequence the way the checkout routes drive it, with the backend and
//! processor replaced by scripted fakes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::{Decimal, dec};

use clementine_core::{CategoryId, OrderId, ProductId};
use clementine_storefront::api::ApiError;
use clementine_storefront::api::types::Product;
use clementine_storefront::cart::Cart;
use clementine_storefront::checkout::{
    BillingDetails, CheckoutOrchestrator, CheckoutSession, CheckoutStatus, LineItem,
    OrdersBackend, PaymentIntent,
};
use clementine_storefront::processor::{
    PaymentDetails, PaymentProcessor, ProcessorError, ProcessorOutcome,
};

fn product(id: i64, name: &str, price: Decimal) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
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

fn card(token: &str) -> PaymentDetails {
    PaymentDetails {
        payment_method: token.to_string(),
    }
}

/// Backend fake assigning sequential order ids.
struct ScriptedBackend {
    next_order: AtomicU32,
    intent_calls: AtomicU32,
    confirm_calls: AtomicU32,
}

impl ScriptedBackend {
    fn new() -> Self {
        Self {
            next_order: AtomicU32::new(1000),
            intent_calls: AtomicU32::new(0),
            confirm_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl OrdersBackend for ScriptedBackend {
    async fn create_payment_intent(
        &self,
        _billing: &BillingDetails,
        items: &[LineItem],
    ) -> Result<PaymentIntent, ApiError> {
        assert!(!items.is_empty(), "intent requested for an empty snapshot");
        self.intent_calls.fetch_add(1, Ordering::SeqCst);
        let order = i64::from(self.next_order.fetch_add(1, Ordering::SeqCst));
        Ok(PaymentIntent {
            order_id: OrderId::new(order),
            client_secret: format!("pi_{order}_secret"),
        })
    }

    async fn confirm_payment(&self, _order_id: OrderId) -> Result<(), ApiError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Processor fake that plays back a script of outcomes, then succeeds.
struct ScriptedProcessor {
    script: Mutex<VecDeque<ProcessorOutcome>>,
}

impl ScriptedProcessor {
    fn with_script(outcomes: Vec<ProcessorOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
        }
    }

    fn succeeding() -> Self {
        Self::with_script(Vec::new())
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedProcessor {
    async fn confirm_payment_method(
        &self,
        _client_secret: &str,
        _details: &PaymentDetails,
    ) -> Result<ProcessorOutcome, ProcessorError> {
        Ok(self
            .script
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(ProcessorOutcome::Succeeded))
    }
}

#[tokio::test]
async fn happy_path_charges_once_and_clears_the_cart() {
    let backend = ScriptedBackend::new();
    let processor = ScriptedProcessor::succeeding();
    let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

    // cart = [{p1, $19.99 x 2}]
    let mut cart = Cart::default();
    cart.add_item(&product(1, "Desk Organizer", dec!(19.99)), 2);
    assert_eq!(cart.total(), dec!(39.98));
    assert_eq!(cart.count(), 2);

    let mut checkout = CheckoutSession::begin(&cart).expect("begin");

    let order_id = orchestrator
        .submit_billing(&mut checkout, &cart, billing())
        .await
        .expect("intent created");
    assert_eq!(checkout.status, CheckoutStatus::IntentCreated);

    orchestrator
        .mount_payment_form(&mut checkout)
        .expect("payment form mounted");

    let receipt = orchestrator
        .submit_payment_method(&mut checkout, &card("pm_tok_visa"))
        .await
        .expect("payment succeeded");

    // Only now does the checkout route clear the cart.
    cart.clear();

    assert_eq!(checkout.status, CheckoutStatus::Succeeded);
    assert_eq!(receipt.order_id, order_id);
    assert_eq!(receipt.total, dec!(39.98));
    assert!(cart.is_empty());
    assert_eq!(backend.intent_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn decline_then_retry_reuses_the_same_intent() {
    let backend = ScriptedBackend::new();
    let processor = ScriptedProcessor::with_script(vec![ProcessorOutcome::Declined {
        reason: "card_declined".to_string(),
    }]);
    let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

    let mut cart = Cart::default();
    cart.add_item(&product(1, "Desk Organizer", dec!(19.99)), 2);
    let cart_before = cart.clone();

    let mut checkout = CheckoutSession::begin(&cart).expect("begin");
    orchestrator
        .submit_billing(&mut checkout, &cart, billing())
        .await
        .expect("intent created");
    orchestrator
        .mount_payment_form(&mut checkout)
        .expect("mounted");

    let intent_secret = checkout.payment_intent_secret.clone();
    let order_id = checkout.order_id;

    // First card is declined.
    let err = orchestrator
        .submit_payment_method(&mut checkout, &card("pm_tok_bad"))
        .await
        .expect_err("declined");
    assert_eq!(err.to_string(), "payment declined: card_declined");
    assert_eq!(checkout.status, CheckoutStatus::AwaitingPaymentMethod);

    // Cart untouched, intent and order retained for the retry.
    assert_eq!(cart, cart_before);
    assert_eq!(checkout.order_id, order_id);
    assert_eq!(checkout.payment_intent_secret, intent_secret);

    // Second card goes through without a second intent creation.
    let receipt = orchestrator
        .submit_payment_method(&mut checkout, &card("pm_tok_other"))
        .await
        .expect("retry succeeded");

    assert_eq!(Some(receipt.order_id), order_id);
    assert_eq!(backend.intent_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn in_flight_checkout_ignores_cart_mutations() {
    let backend = ScriptedBackend::new();
    let processor = ScriptedProcessor::succeeding();
    let orchestrator = CheckoutOrchestrator::new(&backend, &processor);

    let mut cart = Cart::default();
    cart.add_item(&product(1, "Desk Organizer", dec!(10.00)), 1);

    let mut checkout = CheckoutSession::begin(&cart).expect("begin");
    orchestrator
        .submit_billing(&mut checkout, &cart, billing())
        .await
        .expect("intent created");

    // Shopper mutates the cart from another tab mid-checkout.
    cart.add_item(&product(1, "Desk Organizer", dec!(10.00)), 4);
    cart.add_item(&product(2, "Brass Bookends", dec!(34.50)), 1);

    orchestrator
        .mount_payment_form(&mut checkout)
        .expect("mounted");
    let receipt = orchestrator
        .submit_payment_method(&mut checkout, &card("pm_tok_visa"))
        .await
        .expect("payment succeeded");

    // The charge matches the snapshot, not the mutated cart.
    assert_eq!(receipt.total, dec!(10.00));
    assert_eq!(checkout.lines, vec![LineItem {
        product_id: ProductId::new(1),
        quantity: 1,
    }]);
}

#[tokio::test]
async fn empty_cart_cannot_enter_checkout() {
    let err = CheckoutSession::begin(&Cart::default()).expect_err("must reject");
    assert_eq!(err.to_string(), "your cart is empty");
}
