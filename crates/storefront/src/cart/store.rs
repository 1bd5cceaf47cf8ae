//! Cart store: the single place the current snapshot lives.
//!
//! The store pairs an in-memory snapshot with a persistence backend (the
//! session in production, an in-memory double in tests). Writers are the
//! mutation sequencer and the initial-load refetch, nothing else, and every
//! write is one of exactly two shapes: replace the whole snapshot, or tear
//! the whole session down. The loading flag is memory-only and is never
//! persisted, so a rehydrated store is always idle.

use std::future::Future;

use thiserror::Error;
use tower_sessions::Session;
use tracing::warn;

use larkspur_core::SessionToken;

use crate::models::session::{CART_SCHEMA_VERSION, PersistedCart, keys};

use super::projection::CartProjection;
use super::types::CartSnapshot;

/// Error from the cart persistence backend.
#[derive(Debug, Error)]
#[error("cart storage error: {0}")]
pub struct StorageError(String);

impl From<tower_sessions::session::Error> for StorageError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self(err.to_string())
    }
}

/// Persistence backend for the cart store.
///
/// Production uses the session ([`SessionCartStorage`]); tests use an
/// in-memory double. The backend stores two independent entries: the
/// last known-good snapshot and the gateway session token.
pub trait CartStorage: Send + Sync {
    /// Load the persisted snapshot entry, if a valid one exists.
    fn load_cart(
        &self,
    ) -> impl Future<Output = Result<Option<PersistedCart>, StorageError>> + Send;

    /// Persist a snapshot entry, replacing any previous one.
    fn save_cart(
        &self,
        cart: &PersistedCart,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Load the gateway session token, if one is stored.
    fn load_token(
        &self,
    ) -> impl Future<Output = Result<Option<SessionToken>, StorageError>> + Send;

    /// Persist the gateway session token, replacing any previous one.
    fn save_token(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove both the snapshot entry and the token.
    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<S: CartStorage> CartStorage for &S {
    fn load_cart(
        &self,
    ) -> impl Future<Output = Result<Option<PersistedCart>, StorageError>> + Send {
        (**self).load_cart()
    }

    fn save_cart(
        &self,
        cart: &PersistedCart,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).save_cart(cart)
    }

    fn load_token(
        &self,
    ) -> impl Future<Output = Result<Option<SessionToken>, StorageError>> + Send {
        (**self).load_token()
    }

    fn save_token(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).save_token(token)
    }

    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).clear()
    }
}

// =============================================================================
// SessionCartStorage
// =============================================================================

/// Session-backed cart persistence.
#[derive(Debug, Clone)]
pub struct SessionCartStorage {
    session: Session,
}

impl SessionCartStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartStorage for SessionCartStorage {
    fn load_cart(
        &self,
    ) -> impl Future<Output = Result<Option<PersistedCart>, StorageError>> + Send {
        async move {
            // Read as a raw value first: an entry written by an older build
            // must rehydrate as "no snapshot", not as a hard failure.
            let Some(raw) = self.session.get::<serde_json::Value>(keys::CART).await? else {
                return Ok(None);
            };

            match serde_json::from_value::<PersistedCart>(raw) {
                Ok(persisted) if persisted.version == CART_SCHEMA_VERSION => Ok(Some(persisted)),
                Ok(persisted) => {
                    warn!(
                        version = persisted.version,
                        "discarding persisted cart with unknown schema version"
                    );
                    Ok(None)
                }
                Err(err) => {
                    warn!(error = %err, "discarding unreadable persisted cart");
                    Ok(None)
                }
            }
        }
    }

    fn save_cart(
        &self,
        cart: &PersistedCart,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        async move { Ok(self.session.insert(keys::CART, cart).await?) }
    }

    fn load_token(
        &self,
    ) -> impl Future<Output = Result<Option<SessionToken>, StorageError>> + Send {
        async move { Ok(self.session.get::<SessionToken>(keys::GATEWAY_SESSION).await?) }
    }

    fn save_token(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        async move { Ok(self.session.insert(keys::GATEWAY_SESSION, token).await?) }
    }

    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send {
        async move {
            self.session.remove::<serde_json::Value>(keys::CART).await?;
            self.session
                .remove::<serde_json::Value>(keys::GATEWAY_SESSION)
                .await?;
            Ok(())
        }
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// The current cart snapshot plus its persistence backend.
#[derive(Debug)]
pub struct CartStore<S: CartStorage> {
    storage: S,
    snapshot: Option<CartSnapshot>,
    loading: bool,
}

impl<S: CartStorage> CartStore<S> {
    /// Build a store from persisted state.
    ///
    /// The loading flag always starts `false`: a request interrupted
    /// mid-mutation leaves the last known-good snapshot behind and nothing
    /// else.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub async fn rehydrate(storage: S) -> Result<Self, StorageError> {
        let snapshot = storage.load_cart().await?.map(|persisted| persisted.cart);
        Ok(Self {
            storage,
            snapshot,
            loading: false,
        })
    }

    /// The current snapshot, if any.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&CartSnapshot> {
        self.snapshot.as_ref()
    }

    /// Whether a mutation cycle is currently in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    pub const fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// The persistence backend, for token reads and writes.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Replace the snapshot wholesale with a freshly projected one.
    ///
    /// Persists first: if the backend write fails, the in-memory snapshot
    /// stays at the last known-good state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn replace(&mut self, snapshot: CartSnapshot) -> Result<(), StorageError> {
        self.storage.save_cart(&PersistedCart::new(snapshot.clone())).await?;
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Tear down the cart session: drop the snapshot and remove both
    /// persisted entries (snapshot and gateway token).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend removal fails.
    pub async fn clear_session(&mut self) -> Result<(), StorageError> {
        self.storage.clear().await?;
        self.snapshot = None;
        Ok(())
    }

    /// Apply a projection: replace on `Ready`, tear down on `Empty`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn apply(&mut self, projection: CartProjection) -> Result<(), StorageError> {
        match projection {
            CartProjection::Ready(snapshot) => self.replace(snapshot).await,
            CartProjection::Empty => self.clear_session().await,
        }
    }
}

// =============================================================================
// Test support
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// In-memory [`CartStorage`] double. Tests pass `&MemoryStorage` into the
    /// store and keep the original to assert on persisted state.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryStorage {
        pub(crate) cart: Mutex<Option<PersistedCart>>,
        pub(crate) token: Mutex<Option<SessionToken>>,
        pub(crate) fail_saves: Mutex<bool>,
    }

    impl MemoryStorage {
        pub(crate) fn with_cart(snapshot: CartSnapshot) -> Self {
            Self {
                cart: Mutex::new(Some(PersistedCart::new(snapshot))),
                ..Self::default()
            }
        }
    }

    impl CartStorage for MemoryStorage {
        fn load_cart(
            &self,
        ) -> impl Future<Output = Result<Option<PersistedCart>, StorageError>> + Send {
            async move { Ok(self.cart.lock().unwrap().clone()) }
        }

        fn save_cart(
            &self,
            cart: &PersistedCart,
        ) -> impl Future<Output = Result<(), StorageError>> + Send {
            let cart = cart.clone();
            async move {
                if *self.fail_saves.lock().unwrap() {
                    return Err(StorageError("simulated save failure".to_string()));
                }
                *self.cart.lock().unwrap() = Some(cart);
                Ok(())
            }
        }

        fn load_token(
            &self,
        ) -> impl Future<Output = Result<Option<SessionToken>, StorageError>> + Send {
            async move { Ok(self.token.lock().unwrap().clone()) }
        }

        fn save_token(
            &self,
            token: &SessionToken,
        ) -> impl Future<Output = Result<(), StorageError>> + Send {
            let token = token.clone();
            async move {
                *self.token.lock().unwrap() = Some(token);
                Ok(())
            }
        }

        fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send {
            async move {
                *self.cart.lock().unwrap() = None;
                *self.token.lock().unwrap() = None;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use larkspur_core::LineKey;

    use super::testing::MemoryStorage;
    use super::*;
    use crate::cart::types::CartLine;

    fn snapshot(total: &str) -> CartSnapshot {
        CartSnapshot {
            lines: vec![CartLine {
                key: LineKey::from("k1"),
                product_id: 42.into(),
                variation_id: None,
                name: Some("Soap".to_string()),
                image: "/img/soap.jpg".to_string(),
                quantity: 1,
                unit_price: Some(total.to_string()),
                subtotal: Some(total.to_string()),
                total: Some(total.to_string()),
            }],
            item_count: 1,
            subtotal: Some(total.to_string()),
            total: Some(total.to_string()),
        }
    }

    #[tokio::test]
    async fn test_rehydrate_restores_snapshot_but_not_loading() {
        let storage = MemoryStorage::with_cart(snapshot("$5.00"));
        let store = CartStore::rehydrate(&storage).await.unwrap();
        assert!(store.snapshot().is_some());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_replace_persists_versioned_entry() {
        let storage = MemoryStorage::default();
        let mut store = CartStore::rehydrate(&storage).await.unwrap();
        store.replace(snapshot("$5.00")).await.unwrap();

        let persisted = storage.cart.lock().unwrap().clone().unwrap();
        assert_eq!(persisted.version, CART_SCHEMA_VERSION);
        assert_eq!(persisted.cart.total.as_deref(), Some("$5.00"));
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_previous_snapshot() {
        let storage = MemoryStorage::with_cart(snapshot("$5.00"));
        let mut store = CartStore::rehydrate(&storage).await.unwrap();

        *storage.fail_saves.lock().unwrap() = true;
        assert!(store.replace(snapshot("$9.99")).await.is_err());

        assert_eq!(
            store.snapshot().unwrap().total.as_deref(),
            Some("$5.00"),
            "in-memory snapshot must stay at last known-good state"
        );
    }

    #[tokio::test]
    async fn test_clear_session_removes_snapshot_and_token() {
        let storage = MemoryStorage::with_cart(snapshot("$5.00"));
        *storage.token.lock().unwrap() = Some(SessionToken::new("tok".to_string()));

        let mut store = CartStore::rehydrate(&storage).await.unwrap();
        store.clear_session().await.unwrap();

        assert!(store.snapshot().is_none());
        assert!(storage.cart.lock().unwrap().is_none());
        assert!(storage.token.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_empty_tears_down() {
        let storage = MemoryStorage::with_cart(snapshot("$5.00"));
        let mut store = CartStore::rehydrate(&storage).await.unwrap();
        store.apply(CartProjection::Empty).await.unwrap();
        assert!(store.snapshot().is_none());
        assert!(storage.cart.lock().unwrap().is_none());
    }
}
