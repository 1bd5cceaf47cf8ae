//! Cart route handlers.
//!
//! Thin JSON wrappers over the mutation sequencer: every mutation runs the
//! full mutate-then-refetch cycle and responds with whatever snapshot the
//! store holds afterwards. Handlers never shape cart data themselves.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use larkspur_core::{LineKey, ProductId, VariationId};

use crate::cart::{CartSequencer, CartSnapshot, CartStorage, CartStore, SessionCartStorage};
use crate::error::Result;
use crate::gateway::CartGatewayClient;
use crate::state::AppState;

/// Cart response body: the current snapshot, or `null` when no cart exists.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Option<CartSnapshot>,
    pub item_count: u32,
    pub loading: bool,
}

impl CartResponse {
    fn from_store<S: CartStorage>(store: &CartStore<S>) -> Self {
        Self {
            cart: store.snapshot().cloned(),
            item_count: store.snapshot().map_or(0, |snapshot| snapshot.item_count),
            loading: store.is_loading(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    pub variation_id: Option<i64>,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub key: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub key: String,
}

/// Cart count badge response.
#[derive(Debug, Serialize)]
pub struct CartCountResponse {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Build a sequencer over this request's session.
async fn sequencer(
    state: &AppState,
    session: Session,
) -> Result<CartSequencer<'_, CartGatewayClient, SessionCartStorage>> {
    let storage = SessionCartStorage::new(session);
    let seq = CartSequencer::bootstrap(
        state.cart_gateway(),
        storage,
        state.config().gateway.placeholder_image_url.clone(),
    )
    .await?;
    Ok(seq)
}

/// Current cart, refreshed from the gateway.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartResponse>> {
    let mut seq = sequencer(&state, session).await?;
    seq.refresh().await?;
    Ok(Json(CartResponse::from_store(seq.store())))
}

/// Add an item to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<AddToCartForm>,
) -> Result<Json<CartResponse>> {
    let mut seq = sequencer(&state, session).await?;
    seq.add_item(
        ProductId::new(form.product_id),
        form.variation_id.map(VariationId::new),
        form.quantity.unwrap_or(1),
    )
    .await?;
    Ok(Json(CartResponse::from_store(seq.store())))
}

/// Set the quantity of one cart line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<UpdateCartForm>,
) -> Result<Json<CartResponse>> {
    let mut seq = sequencer(&state, session).await?;
    seq.set_line_quantity(&LineKey::from(form.key), form.quantity)
        .await?;
    Ok(Json(CartResponse::from_store(seq.store())))
}

/// Remove one cart line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RemoveFromCartForm>,
) -> Result<Json<CartResponse>> {
    let mut seq = sequencer(&state, session).await?;
    seq.remove_line(&LineKey::from(form.key)).await?;
    Ok(Json(CartResponse::from_store(seq.store())))
}

/// Cart count badge, served from the persisted snapshot without a gateway
/// round-trip.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<Json<CartCountResponse>> {
    let storage = SessionCartStorage::new(session);
    let store = CartStore::rehydrate(storage).await?;
    Ok(Json(CartCountResponse {
        count: store.snapshot().map_or(0, |snapshot| snapshot.item_count),
    }))
}
