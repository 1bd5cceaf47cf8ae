//! Cart view model.
//!
//! These are the types the rest of the application renders from. They are
//! produced exclusively by [`crate::cart::projection`] and replaced wholesale
//! on every refetch; nothing ever mutates an individual field in place.

use serde::{Deserialize, Serialize};

use larkspur_core::{LineKey, ProductId, VariationId};

/// One cart line, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Opaque server-assigned line key; the only valid line identifier for
    /// quantity updates and removals.
    pub key: LineKey,
    pub product_id: ProductId,
    #[serde(default)]
    pub variation_id: Option<VariationId>,
    #[serde(default)]
    pub name: Option<String>,
    /// Product image URL, or the configured placeholder when the gateway
    /// reported none.
    pub image: String,
    pub quantity: u32,
    /// Display-only unit price derived from the line total; `None` when the
    /// total could not be parsed as money.
    #[serde(default)]
    pub unit_price: Option<String>,
    /// Currency-formatted line subtotal as reported by the gateway.
    #[serde(default)]
    pub subtotal: Option<String>,
    /// Currency-formatted line total as reported by the gateway.
    #[serde(default)]
    pub total: Option<String>,
}

/// A complete cart, as last confirmed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    /// Total unit count across all lines, as reported by the gateway.
    pub item_count: u32,
    /// Currency-formatted cart subtotal, opaque to the client.
    #[serde(default)]
    pub subtotal: Option<String>,
    /// Currency-formatted cart total, opaque to the client.
    #[serde(default)]
    pub total: Option<String>,
}
