//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database ping)
//!
//! # Cart
//! GET  /cart                   - Current cart (refreshed from the gateway)
//! POST /cart/add               - Add an item
//! POST /cart/update            - Set a line quantity
//! POST /cart/remove            - Remove a line
//! GET  /cart/count             - Cart count badge (persisted snapshot only)
//!
//! # Checkout
//! GET  /checkout                        - Current progression
//! POST /checkout/back                   - Rewind displayed stage (display-only)
//! POST /checkout/address                - Submit address stage
//! POST /checkout/shipping-rate          - Record shipping rate choice
//! POST /checkout/shipping               - Submit shipping stage
//! POST /checkout/payment-method         - Record payment method choice
//! POST /checkout/payment                - Place the order
//! GET  /checkout/payment-gateways       - Available payment methods
//! ```

pub mod cart;
pub mod checkout;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/back", post(checkout::back))
        .route("/address", post(checkout::submit_address))
        .route("/shipping-rate", post(checkout::select_rate))
        .route("/shipping", post(checkout::submit_shipping))
        .route("/payment-method", post(checkout::select_payment_method))
        .route("/payment", post(checkout::submit_payment))
        .route("/payment-gateways", get(checkout::payment_gateways))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
}
