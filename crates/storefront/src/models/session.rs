//! Session-related types.
//!
//! The session is the storefront's durable local storage: the last known-good
//! cart snapshot and the gateway session credential live here, keyed by the
//! constants in [`keys`]. The checkout progression deliberately does not -
//! only an opaque reference to the in-memory checkout session is stored, so a
//! process restart forgets checkout progress while the cart survives.

use serde::{Deserialize, Serialize};

use crate::cart::CartSnapshot;

/// Schema version of the persisted cart entry.
///
/// Bumped whenever [`PersistedCart`] changes shape. Entries with an unknown
/// version rehydrate as "no snapshot" instead of failing deserialization.
pub const CART_SCHEMA_VERSION: u32 = 1;

/// The durable cart entry stored in the session.
///
/// Only ever written with a terminal, post-refetch snapshot - never an
/// in-flight state - so rehydrating mid-mutation always shows the last
/// known-good cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCart {
    /// Schema version for forward-compatible rehydration.
    pub version: u32,
    /// The serialized snapshot (`{cart: {...}}` shape).
    pub cart: CartSnapshot,
}

impl PersistedCart {
    /// Wrap a snapshot at the current schema version.
    #[must_use]
    pub const fn new(cart: CartSnapshot) -> Self {
        Self {
            version: CART_SCHEMA_VERSION,
            cart,
        }
    }
}

/// Session keys for cart and checkout data.
pub mod keys {
    /// Key for the persisted cart snapshot.
    pub const CART: &str = "cart";

    /// Key for the opaque commerce gateway session token.
    pub const GATEWAY_SESSION: &str = "gateway_session";

    /// Key for the reference into the in-memory checkout session cache.
    pub const CHECKOUT_REF: &str = "checkout_ref";
}
