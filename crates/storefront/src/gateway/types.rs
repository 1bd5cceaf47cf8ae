//! Raw gateway payload types.
//!
//! These mirror the GraphQL response shapes exactly (camelCase field names,
//! nested `product.node` references). They are deserialization targets only;
//! the cart core works with the normalized [`crate::cart::CartSnapshot`]
//! produced by projection.

use serde::{Deserialize, Serialize};

use larkspur_core::{LineKey, ProductId, VariationId};

/// Full cart payload as returned by the `GetCart` query and refetches.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    /// Line item container. Zero nodes means the remote cart session is
    /// empty or expired.
    pub contents: CartContents,
    /// Cart subtotal as a currency-formatted string.
    pub subtotal: Option<String>,
    /// Cart total as a currency-formatted string.
    pub total: Option<String>,
}

/// Line item container within a cart payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartContents {
    /// Sum of line quantities, when the gateway provides it.
    pub item_count: Option<u32>,
    /// Line items in gateway order.
    #[serde(default)]
    pub nodes: Vec<CartItemNode>,
}

/// One raw line item node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemNode {
    /// Opaque line key.
    pub key: String,
    /// Quantity; the gateway never returns zero-quantity lines.
    pub quantity: u32,
    /// Line subtotal (before discounts) as a currency-formatted string.
    pub subtotal: Option<String>,
    /// Line total as a currency-formatted string.
    pub total: Option<String>,
    /// Product reference; `node` may be absent for malformed lines.
    pub product: Option<ProductEdge>,
    /// Variation reference for variable products.
    pub variation: Option<VariationEdge>,
}

/// Edge wrapper around a product node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEdge {
    pub node: Option<ProductNode>,
}

/// Catalog product data snapshotted into the cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub database_id: i64,
    pub name: Option<String>,
    pub image: Option<ImageNode>,
}

/// Product image reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageNode {
    pub source_url: Option<String>,
}

/// Edge wrapper around a variation node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationEdge {
    pub node: Option<VariationNode>,
}

/// Variation data snapshotted into the cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationNode {
    pub database_id: i64,
    pub name: Option<String>,
}

// =============================================================================
// Mutation Inputs
// =============================================================================

/// Input for the `AddToCart` mutation.
#[derive(Debug, Clone)]
pub struct AddToCartInput {
    pub product_id: ProductId,
    pub variation_id: Option<VariationId>,
    pub quantity: u32,
}

/// One `{key, quantity}` pair for the `UpdateItemQuantities` mutation.
///
/// The mutation operates on the full set of line-quantity pairs, not a delta;
/// quantity zero signals removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineQuantityInput {
    pub key: LineKey,
    pub quantity: u32,
}
