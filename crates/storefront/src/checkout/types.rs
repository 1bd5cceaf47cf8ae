//! Checkout data types.
//!
//! Addresses and payment methods are plain serde structs matching the REST
//! contract. The confirmed cart/shipping state returned by the gateway is
//! kept as an opaque JSON blob - it belongs to the gateway, the client only
//! needs the shipping rates out of it.

use serde::{Deserialize, Serialize};

/// A shipping or billing address, submitted as a full-state PUT each time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    #[serde(default)]
    pub address_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Payload for the address stage submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub shipping_address: Address,
    pub billing_address: Address,
}

/// One shipping rate offered by the gateway after address confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingRate {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Currency-formatted cost string; opaque to the client.
    #[serde(default)]
    pub cost: Option<String>,
}

/// One payment method reported by `GET /payment-gateways`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentGateway {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Final order placement payload. Addresses were already confirmed in prior
/// stages; resubmitting them keeps the call a full-state PUT.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub payment_method: String,
    pub billing_address: Address,
    pub shipping_address: Address,
}

/// Result of order placement.
#[derive(Debug, Clone)]
pub enum OrderOutcome {
    /// The gateway wants the shopper sent to an external payment processor.
    /// The local session is handed off, not completed.
    Redirect { url: String },
    /// Order confirmed by the gateway; body kept opaque.
    Confirmed(serde_json::Value),
}

/// Extract the offered shipping rates from an opaque checkout-state blob.
///
/// Missing or malformed `shipping_rates` yields an empty list; the shipping
/// gate then simply cannot be passed, which surfaces as a visible stall
/// rather than a crash.
#[must_use]
pub fn shipping_rates_from(state: &serde_json::Value) -> Vec<ShippingRate> {
    state
        .get("shipping_rates")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
