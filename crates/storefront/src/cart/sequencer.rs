//! Cart mutation sequencer.
//!
//! Every cart mutation runs the same strict cycle:
//!
//! 1. reject if a cycle is already in flight, else set the loading flag
//! 2. send the mutation (tagged with a fresh client mutation id) and discard
//!    its response payload
//! 3. adopt any session token the gateway issued
//! 4. refetch the full cart and project it into the store
//! 5. drop the loading flag
//!
//! The mutation response is never projected; only the refetch updates the
//! store. On any failure the cycle aborts with the snapshot untouched and the
//! loading flag dropped, so the UI keeps showing the last confirmed cart next
//! to the error.

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use larkspur_core::{LineKey, ProductId, SessionToken, VariationId};

use crate::gateway::cart::CartGateway;
use crate::gateway::types::{AddToCartInput, LineQuantityInput};
use crate::gateway::GatewayError;

use super::projection::{CartProjection, project_cart};
use super::store::{CartStorage, CartStore, StorageError};

/// Error from a mutation cycle.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// A mutation cycle is already in flight for this cart.
    #[error("another cart update is already in progress")]
    InFlight,

    /// The gateway call failed; the local snapshot was left untouched.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The persistence backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Orchestrates cart mutations against a gateway and a store.
///
/// Holds the store for the duration of a request; the gateway session token
/// travels with it so refreshed tokens reach both the next call and the
/// persistence backend.
pub struct CartSequencer<'g, G: CartGateway, S: CartStorage> {
    gateway: &'g G,
    store: CartStore<S>,
    token: Option<SessionToken>,
    placeholder_image: String,
}

impl<'g, G: CartGateway, S: CartStorage> CartSequencer<'g, G, S> {
    #[must_use]
    pub const fn new(
        gateway: &'g G,
        store: CartStore<S>,
        token: Option<SessionToken>,
        placeholder_image: String,
    ) -> Self {
        Self {
            gateway,
            store,
            token,
            placeholder_image,
        }
    }

    /// Rehydrate the store and token from a persistence backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub async fn bootstrap(
        gateway: &'g G,
        storage: S,
        placeholder_image: String,
    ) -> Result<Self, StorageError> {
        let token = storage.load_token().await?;
        let store = CartStore::rehydrate(storage).await?;
        Ok(Self::new(gateway, store, token, placeholder_image))
    }

    /// The store, for rendering the current snapshot.
    #[must_use]
    pub const fn store(&self) -> &CartStore<S> {
        &self.store
    }

    /// Fetch the current cart from the gateway and project it into the store.
    ///
    /// Used on initial load. A gateway response with no cart at all leaves
    /// the local snapshot untouched; an empty cart tears the session down.
    ///
    /// # Errors
    ///
    /// Returns an error if a cycle is in flight or the fetch fails.
    pub async fn refresh(&mut self) -> Result<(), SequencerError> {
        self.begin()?;
        let result = self.refetch().await;
        self.store.set_loading(false);
        result
    }

    /// Add an item to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if a cycle is in flight, the mutation is rejected, or
    /// the refetch fails. The snapshot is untouched on any error.
    pub async fn add_item(
        &mut self,
        product_id: ProductId,
        variation_id: Option<VariationId>,
        quantity: u32,
    ) -> Result<(), SequencerError> {
        self.begin()?;
        let result = self
            .run_add(AddToCartInput {
                product_id,
                variation_id,
                quantity,
            })
            .await;
        self.store.set_loading(false);
        result
    }

    /// Set the quantity of one line, identified by its key.
    ///
    /// Quantities below one are ignored without any gateway call: the floor
    /// is a client-side no-op, and removal has its own explicit path
    /// ([`Self::remove_line`]).
    ///
    /// # Errors
    ///
    /// Returns an error if a cycle is in flight, the mutation is rejected, or
    /// the refetch fails.
    pub async fn set_line_quantity(
        &mut self,
        key: &LineKey,
        quantity: u32,
    ) -> Result<(), SequencerError> {
        if quantity < 1 {
            debug!(%key, "ignoring quantity update below minimum");
            return Ok(());
        }
        self.begin()?;
        let result = self.run_quantities(key, quantity).await;
        self.store.set_loading(false);
        result
    }

    /// Remove one line, identified by its key, by setting its quantity to
    /// zero in the full reconstructed list.
    ///
    /// # Errors
    ///
    /// Returns an error if a cycle is in flight, the mutation is rejected, or
    /// the refetch fails.
    pub async fn remove_line(&mut self, key: &LineKey) -> Result<(), SequencerError> {
        self.begin()?;
        let result = self.run_quantities(key, 0).await;
        self.store.set_loading(false);
        result
    }

    // =========================================================================
    // Cycle internals
    // =========================================================================

    fn begin(&mut self) -> Result<(), SequencerError> {
        if self.store.is_loading() {
            return Err(SequencerError::InFlight);
        }
        self.store.set_loading(true);
        Ok(())
    }

    async fn run_add(&mut self, input: AddToCartInput) -> Result<(), SequencerError> {
        let mutation_id = Uuid::new_v4().to_string();
        let reply = self
            .gateway
            .add_to_cart(self.token.as_ref(), &input, &mutation_id)
            .await?;
        self.adopt_token(reply.session_token).await?;
        self.refetch().await
    }

    async fn run_quantities(
        &mut self,
        key: &LineKey,
        quantity: u32,
    ) -> Result<(), SequencerError> {
        let items = self.rebuild_items(key, quantity);
        if items.is_empty() {
            // No snapshot means nothing to update against.
            debug!(%key, "quantity update with no local cart; skipping");
            return Ok(());
        }

        let mutation_id = Uuid::new_v4().to_string();
        let reply = self
            .gateway
            .update_item_quantities(self.token.as_ref(), &items, &mutation_id)
            .await?;
        self.adopt_token(reply.session_token).await?;
        self.refetch().await
    }

    /// Reconstruct the full `{key, quantity}` list from the snapshot, with
    /// one line's quantity overridden. A key not present in the snapshot
    /// yields the list unchanged, which the gateway treats as a no-op.
    fn rebuild_items(&self, key: &LineKey, quantity: u32) -> Vec<LineQuantityInput> {
        self.store.snapshot().map_or_else(Vec::new, |snapshot| {
            snapshot
                .lines
                .iter()
                .map(|line| LineQuantityInput {
                    key: line.key.clone(),
                    quantity: if line.key == *key { quantity } else { line.quantity },
                })
                .collect()
        })
    }

    async fn adopt_token(&mut self, token: Option<SessionToken>) -> Result<(), StorageError> {
        if let Some(token) = token {
            self.store.storage().save_token(&token).await?;
            self.token = Some(token);
        }
        Ok(())
    }

    async fn refetch(&mut self) -> Result<(), SequencerError> {
        let reply = self.gateway.get_cart(self.token.as_ref()).await?;
        self.adopt_token(reply.session_token).await?;

        match reply.data {
            Some(payload) => {
                let projection = project_cart(&payload, &self.placeholder_image);
                let torn_down = matches!(projection, CartProjection::Empty);
                self.store.apply(projection).await?;
                if torn_down {
                    self.token = None;
                }
            }
            None => {
                debug!("gateway reported no cart; leaving local snapshot untouched");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::cart::store::testing::MemoryStorage;
    use crate::gateway::cart::GatewayReply;
    use crate::gateway::types::CartPayload;

    const PLACEHOLDER: &str = "/static/img/placeholder.png";

    /// Scripted gateway double: queued `get_cart` results, optional scripted
    /// mutation failures, and full call recording.
    #[derive(Default)]
    struct MockGateway {
        get_cart_results: Mutex<VecDeque<Result<Option<CartPayload>, GatewayError>>>,
        mutation_failures: Mutex<VecDeque<GatewayError>>,
        issue_token: Mutex<Option<String>>,
        recorded_adds: Mutex<Vec<(AddToCartInput, String)>>,
        recorded_updates: Mutex<Vec<Vec<LineQuantityInput>>>,
        get_cart_calls: Mutex<u32>,
    }

    impl MockGateway {
        fn queue_cart(&self, payload: Option<CartPayload>) {
            self.get_cart_results.lock().unwrap().push_back(Ok(payload));
        }

        fn queue_mutation_failure(&self, error: GatewayError) {
            self.mutation_failures.lock().unwrap().push_back(error);
        }

        fn issued_token(&self) -> Option<SessionToken> {
            self.issue_token
                .lock()
                .unwrap()
                .clone()
                .map(SessionToken::new)
        }
    }

    impl CartGateway for MockGateway {
        fn get_cart(
            &self,
            _token: Option<&SessionToken>,
        ) -> impl Future<Output = Result<GatewayReply<Option<CartPayload>>, GatewayError>> + Send
        {
            async move {
                *self.get_cart_calls.lock().unwrap() += 1;
                let data = self
                    .get_cart_results
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("unexpected get_cart call")?;
                Ok(GatewayReply {
                    data,
                    session_token: self.issued_token(),
                })
            }
        }

        fn add_to_cart(
            &self,
            _token: Option<&SessionToken>,
            input: &AddToCartInput,
            client_mutation_id: &str,
        ) -> impl Future<Output = Result<GatewayReply<()>, GatewayError>> + Send {
            let input = input.clone();
            let mutation_id = client_mutation_id.to_string();
            async move {
                if let Some(error) = self.mutation_failures.lock().unwrap().pop_front() {
                    return Err(error);
                }
                self.recorded_adds.lock().unwrap().push((input, mutation_id));
                Ok(GatewayReply {
                    data: (),
                    session_token: self.issued_token(),
                })
            }
        }

        fn update_item_quantities(
            &self,
            _token: Option<&SessionToken>,
            items: &[LineQuantityInput],
            _client_mutation_id: &str,
        ) -> impl Future<Output = Result<GatewayReply<()>, GatewayError>> + Send {
            let items = items.to_vec();
            async move {
                if let Some(error) = self.mutation_failures.lock().unwrap().pop_front() {
                    return Err(error);
                }
                self.recorded_updates.lock().unwrap().push(items);
                Ok(GatewayReply {
                    data: (),
                    session_token: self.issued_token(),
                })
            }
        }
    }

    fn two_line_payload() -> CartPayload {
        serde_json::from_value(json!({
            "contents": {
                "itemCount": 5,
                "nodes": [
                    {"key": "k1", "quantity": 2, "subtotal": "$20.00", "total": "$20.00",
                     "product": {"node": {"databaseId": 42, "name": "Soap", "image": null}},
                     "variation": null},
                    {"key": "k2", "quantity": 3, "subtotal": "$30.00", "total": "$30.00",
                     "product": {"node": {"databaseId": 43, "name": "Candle", "image": null}},
                     "variation": null}
                ]
            },
            "subtotal": "$50.00",
            "total": "$50.00"
        }))
        .unwrap()
    }

    fn empty_payload() -> CartPayload {
        serde_json::from_value(json!({
            "contents": {"itemCount": 0, "nodes": []},
            "subtotal": null,
            "total": null
        }))
        .unwrap()
    }

    async fn seeded_sequencer<'g>(
        gateway: &'g MockGateway,
        storage: &'g MemoryStorage,
    ) -> CartSequencer<'g, MockGateway, &'g MemoryStorage> {
        CartSequencer::bootstrap(gateway, storage, PLACEHOLDER.to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_item_refetches_and_replaces_snapshot() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();
        gateway.queue_cart(Some(two_line_payload()));

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.add_item(ProductId::new(42), None, 2).await.unwrap();

        let snapshot = seq.store().snapshot().unwrap();
        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.item_count, 5);
        assert!(!seq.store().is_loading());

        // The mutation itself was recorded with a fresh mutation id
        let adds = gateway.recorded_adds.lock().unwrap();
        assert_eq!(adds.len(), 1);
        assert_eq!(adds[0].0.product_id, ProductId::new(42));
        assert!(!adds[0].1.is_empty());

        // Refetched exactly once, and the result was persisted
        assert_eq!(*gateway.get_cart_calls.lock().unwrap(), 1);
        assert!(storage.cart.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_issued_token_is_adopted_and_persisted() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();
        *gateway.issue_token.lock().unwrap() = Some("fresh-token".to_string());
        gateway.queue_cart(Some(two_line_payload()));

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.add_item(ProductId::new(42), None, 1).await.unwrap();

        let stored = storage.token.lock().unwrap().clone().unwrap();
        assert_eq!(stored.expose(), "fresh-token");
    }

    #[tokio::test]
    async fn test_quantity_below_one_is_a_silent_no_op() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.set_line_quantity(&LineKey::from("k1"), 0).await.unwrap();

        assert!(gateway.recorded_updates.lock().unwrap().is_empty());
        assert_eq!(*gateway.get_cart_calls.lock().unwrap(), 0);
        assert!(!seq.store().is_loading());
    }

    #[tokio::test]
    async fn test_quantity_update_sends_full_reconstructed_list() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();
        gateway.queue_cart(Some(two_line_payload()));
        gateway.queue_cart(Some(two_line_payload()));

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.refresh().await.unwrap();
        seq.set_line_quantity(&LineKey::from("k1"), 5).await.unwrap();

        let updates = gateway.recorded_updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0],
            vec![
                LineQuantityInput {
                    key: LineKey::from("k1"),
                    quantity: 5
                },
                LineQuantityInput {
                    key: LineKey::from("k2"),
                    quantity: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_sets_zero_in_full_list() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();
        gateway.queue_cart(Some(two_line_payload()));
        gateway.queue_cart(Some(two_line_payload()));

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.refresh().await.unwrap();
        seq.remove_line(&LineKey::from("k2")).await.unwrap();

        let updates = gateway.recorded_updates.lock().unwrap();
        assert_eq!(
            updates[0],
            vec![
                LineQuantityInput {
                    key: LineKey::from("k1"),
                    quantity: 2
                },
                LineQuantityInput {
                    key: LineKey::from("k2"),
                    quantity: 0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_absent_key_sends_unchanged_list() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();
        gateway.queue_cart(Some(two_line_payload()));
        gateway.queue_cart(Some(two_line_payload()));

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.refresh().await.unwrap();
        seq.remove_line(&LineKey::from("no-such-key")).await.unwrap();

        let updates = gateway.recorded_updates.lock().unwrap();
        assert_eq!(
            updates[0],
            vec![
                LineQuantityInput {
                    key: LineKey::from("k1"),
                    quantity: 2
                },
                LineQuantityInput {
                    key: LineKey::from("k2"),
                    quantity: 3
                },
            ],
            "absent key must yield the list unchanged (server-side no-op)"
        );
    }

    #[tokio::test]
    async fn test_empty_refetch_tears_down_session() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();
        gateway.queue_cart(Some(two_line_payload()));
        gateway.queue_cart(Some(empty_payload()));

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.refresh().await.unwrap();
        assert!(seq.store().snapshot().is_some());

        seq.remove_line(&LineKey::from("k1")).await.unwrap();

        assert!(seq.store().snapshot().is_none());
        assert!(storage.cart.lock().unwrap().is_none());
        assert!(storage.token.lock().unwrap().is_none());
        assert!(seq.token.is_none());
    }

    #[tokio::test]
    async fn test_mutation_failure_leaves_snapshot_untouched() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();
        gateway.queue_cart(Some(two_line_payload()));
        gateway.queue_mutation_failure(GatewayError::UserError("Out of stock".to_string()));

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.refresh().await.unwrap();

        let err = seq
            .set_line_quantity(&LineKey::from("k1"), 99)
            .await
            .unwrap_err();
        assert!(matches!(err, SequencerError::Gateway(_)));

        // Snapshot unchanged, loading dropped, no refetch happened
        assert_eq!(seq.store().snapshot().unwrap().lines[0].quantity, 2);
        assert!(!seq.store().is_loading());
        assert_eq!(*gateway.get_cart_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_cycle_rejects_second_mutation() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.store.set_loading(true);

        let err = seq.add_item(ProductId::new(1), None, 1).await.unwrap_err();
        assert!(matches!(err, SequencerError::InFlight));
        assert!(gateway.recorded_adds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_cart_response_leaves_snapshot_untouched() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();
        gateway.queue_cart(Some(two_line_payload()));
        gateway.queue_cart(None);

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.refresh().await.unwrap();
        seq.refresh().await.unwrap();

        assert!(seq.store().snapshot().is_some());
        assert!(storage.cart.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_with_no_snapshot_skips_network() {
        let gateway = MockGateway::default();
        let storage = MemoryStorage::default();

        let mut seq = seeded_sequencer(&gateway, &storage).await;
        seq.set_line_quantity(&LineKey::from("k1"), 2).await.unwrap();

        assert!(gateway.recorded_updates.lock().unwrap().is_empty());
        assert_eq!(*gateway.get_cart_calls.lock().unwrap(), 0);
    }
}
