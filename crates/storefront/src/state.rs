//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::checkout::CheckoutSession;
use crate::config::StorefrontConfig;
use crate::gateway::{CartGatewayClient, CheckoutClient};

/// How long an untouched checkout progression survives in memory.
const CHECKOUT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    cart_gateway: CartGatewayClient,
    checkout: CheckoutClient,
    /// Checkout progressions, keyed by the opaque reference stored in the
    /// shopper's session. Memory-only on purpose: a restart forgets checkout
    /// progress while the cart (in the durable session) survives.
    checkout_sessions: moka::sync::Cache<String, CheckoutSession>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let cart_gateway = CartGatewayClient::new(&config.gateway);
        let checkout = CheckoutClient::new(&config.gateway);
        let checkout_sessions = moka::sync::Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(CHECKOUT_SESSION_IDLE)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cart_gateway,
                checkout,
                checkout_sessions,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the cart gateway GraphQL client.
    #[must_use]
    pub fn cart_gateway(&self) -> &CartGatewayClient {
        &self.inner.cart_gateway
    }

    /// Get a reference to the checkout REST client.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutClient {
        &self.inner.checkout
    }

    /// Get a reference to the in-memory checkout session cache.
    #[must_use]
    pub fn checkout_sessions(&self) -> &moka::sync::Cache<String, CheckoutSession> {
        &self.inner.checkout_sessions
    }
}
