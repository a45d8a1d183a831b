//! Checkout route handlers.
//!
//! Each handler loads the in-flight [`CheckoutSession`] from the session
//! slot, advances it through [`CheckoutOrchestrator`], and writes it back -
//! including on failure, so retryable errors resume from the right step
//! after a reload. The cart is cleared in exactly one place: on a confirmed
//! success, right before the receipt is returned.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use clementine_core::{CurrencyCode, OrderId, Price};

use crate::cart::CartStore;
use crate::checkout::{BillingDetails, CheckoutOrchestrator, CheckoutSession, CheckoutStatus};
use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::processor::PaymentDetails;
use crate::state::AppState;

/// Checkout status response.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub status: CheckoutStatus,
}

/// Billing step response.
#[derive(Debug, Serialize)]
pub struct BillingView {
    pub status: CheckoutStatus,
    pub order_id: OrderId,
}

/// Payment step response: what the payment UI needs to mount.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub status: CheckoutStatus,
    pub payment_intent_secret: String,
    pub publishable_key: String,
}

/// Receipt handed to the success page.
#[derive(Debug, Serialize)]
pub struct ReceiptView {
    pub status: CheckoutStatus,
    pub order_id: OrderId,
    pub total: String,
}

/// Load the in-flight checkout from the session.
async fn load_checkout(session: &Session) -> Result<CheckoutSession> {
    session
        .get::<CheckoutSession>(session_keys::CHECKOUT)
        .await?
        .ok_or_else(|| AppError::NotFound("no checkout in progress".to_string()))
}

/// Persist the checkout back to the session.
async fn save_checkout(session: &Session, checkout: &CheckoutSession) -> Result<()> {
    session.insert(session_keys::CHECKOUT, checkout).await?;
    Ok(())
}

/// Begin a checkout attempt.
///
/// Rejected before any network call if the cart is empty.
#[instrument(skip(session))]
pub async fn start(session: Session) -> Result<Json<StatusView>> {
    let store = CartStore::load(session.clone()).await;
    let checkout = CheckoutSession::begin(store.cart())?;
    save_checkout(&session, &checkout).await?;

    Ok(Json(StatusView {
        status: checkout.status,
    }))
}

/// Submit billing details and create the payment intent.
#[instrument(skip(state, session, billing))]
pub async fn billing(
    State(state): State<AppState>,
    session: Session,
    Json(billing): Json<BillingDetails>,
) -> Result<Json<BillingView>> {
    let store = CartStore::load(session.clone()).await;
    let mut checkout = load_checkout(&session).await?;

    let orchestrator = CheckoutOrchestrator::new(state.api(), state.processor());
    let result = orchestrator
        .submit_billing(&mut checkout, store.cart(), billing)
        .await;

    // Persist whatever state the attempt ended in, success or not, so a
    // retry resumes from the right step.
    save_checkout(&session, &checkout).await?;
    let order_id = result?;

    Ok(Json(BillingView {
        status: checkout.status,
        order_id,
    }))
}

/// Mount the payment form: return the intent secret and publishable key.
#[instrument(skip(state, session))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PaymentView>> {
    let mut checkout = load_checkout(&session).await?;

    let orchestrator = CheckoutOrchestrator::new(state.api(), state.processor());
    let secret = orchestrator.mount_payment_form(&mut checkout)?;
    save_checkout(&session, &checkout).await?;

    Ok(Json(PaymentView {
        status: checkout.status,
        payment_intent_secret: secret,
        publishable_key: state.config().payment.publishable_key.clone(),
    }))
}

/// Submit the payment method and confirm the order.
///
/// On success the cart is cleared and the checkout session destroyed; the
/// receipt carries the order id and the snapshot total.
#[instrument(skip(state, session, details))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    Json(details): Json<PaymentDetails>,
) -> Result<Json<ReceiptView>> {
    let mut checkout = load_checkout(&session).await?;

    let orchestrator = CheckoutOrchestrator::new(state.api(), state.processor());
    let result = orchestrator
        .submit_payment_method(&mut checkout, &details)
        .await;

    match result {
        Ok(receipt) => {
            // Confirmed success is the only thing that clears the cart.
            let mut store = CartStore::load(session.clone()).await;
            store.clear().await?;
            session
                .remove::<CheckoutSession>(session_keys::CHECKOUT)
                .await?;

            Ok(Json(ReceiptView {
                status: CheckoutStatus::Succeeded,
                order_id: receipt.order_id,
                total: Price::new(receipt.total, CurrencyCode::USD).display(),
            }))
        }
        Err(e) => {
            // Declines resume at the payment step; a reconciliation risk
            // stays visible in the session as Failed. Cart untouched.
            save_checkout(&session, &checkout).await?;
            Err(e.into())
        }
    }
}

/// Abandon the checkout attempt. The cart is left undisturbed.
#[instrument(skip(session))]
pub async fn cancel(session: Session) -> Result<StatusCode> {
    session
        .remove::<CheckoutSession>(session_keys::CHECKOUT)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
