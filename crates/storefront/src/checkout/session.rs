//! Checkout session state machine.
//!
//! A strictly ordered progression: ADDRESS -> SHIPPING -> PAYMENT ->
//! COMPLETED. Each forward transition is gated on a successful gateway call
//! plus a local precondition; failures record a user-visible error and hold
//! the current stage. `back()` only rewinds what is displayed - confirmed
//! data and gate flags survive, and resubmitting a stage overwrites rather
//! than branches.
//!
//! The whole session is memory-only by design (it lives in the process-local
//! checkout cache, never the durable session store): a restart mid-checkout
//! forgets the progression while the cart survives, and the shopper starts
//! again from ADDRESS against an intact cart.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use larkspur_core::SessionToken;

use crate::cart::store::{CartStorage, CartStore, StorageError};
use crate::gateway::checkout::CheckoutApi;

use super::types::{
    CustomerUpdate, OrderOutcome, OrderRequest, PaymentGateway, ShippingRate,
    shipping_rates_from,
};

/// Checkout stages, in order. There are no other transitions than one step
/// forward per successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Address,
    Shipping,
    Payment,
    Completed,
}

/// Result of a payment submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The shopper must be sent to an external payment processor. Nothing is
    /// cleared; completion happens out of band.
    HandOff { url: String },
    /// The order was confirmed; the cart session has been torn down.
    Completed,
    /// The submission did not go through; the session holds at PAYMENT with
    /// a user-visible error recorded.
    Held,
}

/// One shopper's checkout progression.
///
/// Serializes to the state the UI renders; the opaque gateway blobs and the
/// raw address form are internal and skipped.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    stage: Stage,
    address_confirmed: bool,
    selected_rate: Option<String>,
    selected_payment_method: Option<String>,
    shipping_rates: Vec<ShippingRate>,
    /// Last submission error, if any. Cleared at the start of each
    /// submission; never retried automatically.
    error: Option<String>,
    completed: bool,
    #[serde(skip)]
    address_form: Option<CustomerUpdate>,
    #[serde(skip)]
    remote_state: Option<Value>,
}

impl Default for CheckoutSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutSession {
    /// A fresh session at the ADDRESS stage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stage: Stage::Address,
            address_confirmed: false,
            selected_rate: None,
            selected_payment_method: None,
            shipping_rates: Vec::new(),
            error: None,
            completed: false,
            address_form: None,
            remote_state: None,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn shipping_rates(&self) -> &[ShippingRate] {
        &self.shipping_rates
    }

    #[must_use]
    pub fn selected_rate(&self) -> Option<&str> {
        self.selected_rate.as_deref()
    }

    /// The gateway's last confirmed checkout state (cart totals, etc.),
    /// opaque to the session itself.
    #[must_use]
    pub const fn remote_state(&self) -> Option<&Value> {
        self.remote_state.as_ref()
    }

    /// Rewind the displayed stage by one. Display-only: confirmed data, gate
    /// flags, and the selected rate all survive, so moving forward again
    /// resubmits over the previous confirmation.
    pub const fn back(&mut self) {
        self.stage = match self.stage {
            Stage::Shipping => Stage::Address,
            Stage::Payment => Stage::Shipping,
            Stage::Address | Stage::Completed => self.stage,
        };
    }

    /// Record the shopper's shipping rate choice. Validated against the
    /// offered rates at submission, not here.
    pub fn select_shipping_rate(&mut self, rate_id: String) {
        self.selected_rate = Some(rate_id);
    }

    /// Record the shopper's payment method choice.
    pub fn select_payment_method(&mut self, method_id: String) {
        self.selected_payment_method = Some(method_id);
    }

    /// Submit the ADDRESS stage.
    ///
    /// On success the gateway's confirmed state (including offered shipping
    /// rates) is captured and the session advances to SHIPPING - never
    /// further, even if rates are already known. On failure the stage holds,
    /// the error is recorded, and the submitted form is kept so the shopper
    /// can correct it.
    pub async fn submit_address<A: CheckoutApi>(
        &mut self,
        api: &A,
        token: Option<&SessionToken>,
        update: CustomerUpdate,
    ) {
        self.error = None;
        self.address_form = Some(update.clone());

        match api.update_customer(token, &update).await {
            Ok(state) => {
                self.shipping_rates = shipping_rates_from(&state);
                self.remote_state = Some(state);
                self.address_confirmed = true;
                self.stage = Stage::Shipping;
                info!(rates = self.shipping_rates.len(), "address confirmed");
            }
            Err(err) => {
                warn!(error = %err, "address submission rejected");
                self.error = Some(err.user_message());
            }
        }
    }

    /// Submit the SHIPPING stage.
    ///
    /// Gated on a selected rate: without one, no gateway call is made and a
    /// user-visible error is recorded. On success the updated totals replace
    /// the captured state and the session advances to PAYMENT.
    pub async fn submit_shipping<A: CheckoutApi>(
        &mut self,
        api: &A,
        token: Option<&SessionToken>,
    ) {
        self.error = None;

        let Some(rate_id) = self.selected_rate.clone() else {
            self.error = Some("Select a shipping method to continue.".to_string());
            return;
        };

        match api.select_shipping_rate(token, &rate_id).await {
            Ok(state) => {
                self.remote_state = Some(state);
                self.stage = Stage::Payment;
                info!(rate = %rate_id, "shipping rate confirmed");
            }
            Err(err) => {
                warn!(error = %err, "shipping rate submission rejected");
                self.error = Some(err.user_message());
            }
        }
    }

    /// Submit the PAYMENT stage and place the order.
    ///
    /// When no payment method has been chosen and the gateway offers exactly
    /// one, that one is selected automatically; with several on offer the
    /// submission holds with an error instead of guessing. A redirect outcome
    /// hands the shopper off without clearing anything; a confirmation tears
    /// the cart session down and completes the progression.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cart teardown fails after a confirmed
    /// order. Gateway rejections are recorded on the session and reported as
    /// [`PaymentOutcome::Held`].
    pub async fn submit_payment<A: CheckoutApi, S: CartStorage>(
        &mut self,
        api: &A,
        token: Option<&SessionToken>,
        cart: &mut CartStore<S>,
    ) -> Result<PaymentOutcome, StorageError> {
        self.error = None;

        let Some(method) = self.resolve_payment_method(api, token).await else {
            return Ok(PaymentOutcome::Held);
        };

        let Some(addresses) = self.address_form.clone() else {
            // Cannot happen through the normal progression; recover visibly.
            self.error = Some("Please confirm your address first.".to_string());
            return Ok(PaymentOutcome::Held);
        };

        let order = OrderRequest {
            payment_method: method,
            billing_address: addresses.billing_address,
            shipping_address: addresses.shipping_address,
        };

        match api.place_order(token, &order).await {
            Ok(OrderOutcome::Redirect { url }) => {
                info!("order placed; handing off to payment processor");
                Ok(PaymentOutcome::HandOff { url })
            }
            Ok(OrderOutcome::Confirmed(_)) => {
                cart.clear_session().await?;
                self.stage = Stage::Completed;
                self.completed = true;
                info!("order confirmed");
                Ok(PaymentOutcome::Completed)
            }
            Err(err) => {
                warn!(error = %err, "order placement rejected");
                self.error = Some(err.user_message());
                Ok(PaymentOutcome::Held)
            }
        }
    }

    /// The payment method to charge: the shopper's choice, or the only
    /// offered method when exactly one exists. `None` records an error.
    async fn resolve_payment_method<A: CheckoutApi>(
        &mut self,
        api: &A,
        token: Option<&SessionToken>,
    ) -> Option<String> {
        if let Some(method) = &self.selected_payment_method {
            return Some(method.clone());
        }

        match api.payment_gateways(token).await {
            Ok(gateways) => match <[PaymentGateway; 1]>::try_from(gateways) {
                Ok([only]) => {
                    self.selected_payment_method = Some(only.id.clone());
                    Some(only.id)
                }
                Err(_) => {
                    self.error = Some("Select a payment method to continue.".to_string());
                    None
                }
            },
            Err(err) => {
                self.error = Some(err.user_message());
                None
            }
        }
    }
}
