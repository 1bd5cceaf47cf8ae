//! Checkout orchestration.
//!
//! A [`session::CheckoutSession`] walks the shopper through a strictly
//! ordered progression (address, shipping, payment) against the gateway's
//! REST checkout API, then tears the cart session down on a confirmed order.
//! Sessions are process-local and expire from the in-memory cache; only the
//! cart is durable.

pub mod session;
pub mod types;

pub use session::{CheckoutSession, PaymentOutcome, Stage};
pub use types::{
    Address, CustomerUpdate, OrderOutcome, OrderRequest, PaymentGateway, ShippingRate,
};
