//! Gateway session credential.
//!
//! The commerce gateway issues an opaque session token that ties a guest or
//! customer to their remote cart. The storefront stores it, replays it on
//! every gateway call, and purges it on session clear. It is never inspected.

use serde::{Deserialize, Serialize};

/// Opaque bearer credential for the commerce gateway session.
///
/// `Debug` is redacted so the token cannot leak into logs or error reports.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token received from the gateway.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// Expose the raw token for an outbound request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}
