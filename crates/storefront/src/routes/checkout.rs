//! Checkout route handlers.
//!
//! Each handler loads the shopper's checkout session from the in-memory
//! cache (keyed by an opaque reference stored in the durable session),
//! applies one submission, writes the session back, and responds with the
//! serialized progression. Gateway rejections surface inside the session as
//! user-visible errors, not as HTTP failures.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use larkspur_core::SessionToken;

use crate::cart::{CartStorage, CartStore, SessionCartStorage};
use crate::checkout::{CheckoutSession, CustomerUpdate, PaymentGateway, PaymentOutcome};
use crate::error::Result;
use crate::models::session::keys;
use crate::state::AppState;

/// Shipping rate selection form data.
#[derive(Debug, Deserialize)]
pub struct SelectRateForm {
    pub rate_id: String,
}

/// Payment method selection form data.
#[derive(Debug, Deserialize)]
pub struct SelectPaymentMethodForm {
    pub payment_method: String,
}

/// Payment submission response: the progression plus the hand-off URL when
/// the gateway redirected to an external processor.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    #[serde(flatten)]
    pub session: CheckoutSession,
    pub redirect_url: Option<String>,
}

// =============================================================================
// Session cache plumbing
// =============================================================================

/// Fetch (or mint) the opaque reference into the checkout session cache.
async fn checkout_ref(session: &Session) -> Result<String> {
    if let Some(reference) = session.get::<String>(keys::CHECKOUT_REF).await? {
        return Ok(reference);
    }
    let reference = Uuid::new_v4().to_string();
    session.insert(keys::CHECKOUT_REF, &reference).await?;
    Ok(reference)
}

/// Load the shopper's checkout session, starting a fresh one when none
/// exists (including after cache expiry or a restart).
fn load_checkout(state: &AppState, reference: &str) -> CheckoutSession {
    state
        .checkout_sessions()
        .get(reference)
        .unwrap_or_default()
}

fn store_checkout(state: &AppState, reference: &str, checkout: &CheckoutSession) {
    state
        .checkout_sessions()
        .insert(reference.to_string(), checkout.clone());
}

async fn gateway_token(session: &Session) -> Result<Option<SessionToken>> {
    Ok(SessionCartStorage::new(session.clone()).load_token().await?)
}

// =============================================================================
// Handlers
// =============================================================================

/// Current checkout progression.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutSession>> {
    let reference = checkout_ref(&session).await?;
    Ok(Json(load_checkout(&state, &reference)))
}

/// Rewind the displayed stage by one (display-only).
#[instrument(skip(state, session))]
pub async fn back(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutSession>> {
    let reference = checkout_ref(&session).await?;
    let mut checkout = load_checkout(&state, &reference);
    checkout.back();
    store_checkout(&state, &reference, &checkout);
    Ok(Json(checkout))
}

/// Submit the address stage.
#[instrument(skip(state, session, form))]
pub async fn submit_address(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CustomerUpdate>,
) -> Result<Json<CheckoutSession>> {
    let reference = checkout_ref(&session).await?;
    let token = gateway_token(&session).await?;

    let mut checkout = load_checkout(&state, &reference);
    checkout
        .submit_address(state.checkout(), token.as_ref(), form)
        .await;
    store_checkout(&state, &reference, &checkout);
    Ok(Json(checkout))
}

/// Record the shopper's shipping rate choice.
#[instrument(skip(state, session))]
pub async fn select_rate(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SelectRateForm>,
) -> Result<Json<CheckoutSession>> {
    let reference = checkout_ref(&session).await?;
    let mut checkout = load_checkout(&state, &reference);
    checkout.select_shipping_rate(form.rate_id);
    store_checkout(&state, &reference, &checkout);
    Ok(Json(checkout))
}

/// Submit the shipping stage.
#[instrument(skip(state, session))]
pub async fn submit_shipping(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutSession>> {
    let reference = checkout_ref(&session).await?;
    let token = gateway_token(&session).await?;

    let mut checkout = load_checkout(&state, &reference);
    checkout.submit_shipping(state.checkout(), token.as_ref()).await;
    store_checkout(&state, &reference, &checkout);
    Ok(Json(checkout))
}

/// Record the shopper's payment method choice.
#[instrument(skip(state, session))]
pub async fn select_payment_method(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SelectPaymentMethodForm>,
) -> Result<Json<CheckoutSession>> {
    let reference = checkout_ref(&session).await?;
    let mut checkout = load_checkout(&state, &reference);
    checkout.select_payment_method(form.payment_method);
    store_checkout(&state, &reference, &checkout);
    Ok(Json(checkout))
}

/// Submit the payment stage and place the order.
///
/// A confirmed order tears down the cart session and discards the checkout
/// progression; a redirect leaves both intact for the external processor's
/// round-trip.
#[instrument(skip(state, session))]
pub async fn submit_payment(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PaymentResponse>> {
    let reference = checkout_ref(&session).await?;
    let token = gateway_token(&session).await?;

    let storage = SessionCartStorage::new(session.clone());
    let mut cart = CartStore::rehydrate(storage).await?;

    let mut checkout = load_checkout(&state, &reference);
    let outcome = checkout
        .submit_payment(state.checkout(), token.as_ref(), &mut cart)
        .await?;

    let redirect_url = match outcome {
        PaymentOutcome::HandOff { url } => Some(url),
        PaymentOutcome::Completed => {
            // The progression is finished; forget it so the next checkout
            // starts fresh.
            state.checkout_sessions().invalidate(&reference);
            session.remove::<String>(keys::CHECKOUT_REF).await?;
            None
        }
        PaymentOutcome::Held => None,
    };

    if !checkout.is_completed() {
        store_checkout(&state, &reference, &checkout);
    }

    Ok(Json(PaymentResponse {
        session: checkout,
        redirect_url,
    }))
}

/// Available payment methods.
#[instrument(skip(state, session))]
pub async fn payment_gateways(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<PaymentGateway>>> {
    use crate::gateway::CheckoutApi;

    let token = gateway_token(&session).await?;
    let gateways = state.checkout().payment_gateways(token.as_ref()).await?;
    Ok(Json(gateways))
}
