//! Payload-to-snapshot projection.
//!
//! Pure functions from a raw gateway payload to the view model. No I/O, no
//! store access; the caller decides what to do with the result. The empty
//! case is deliberately its own variant because an empty payload means the
//! remote cart session is gone and the local session must be torn down, which
//! is a different action from rendering a cart.

use larkspur_core::{LineKey, ProductId, VariationId, format_amount, unit_price};
use tracing::warn;

use crate::gateway::types::{CartItemNode, CartPayload};

use super::types::{CartLine, CartSnapshot};

/// Currency symbol for the display-only derived unit price. Cart-level money
/// strings come pre-formatted from the gateway and pass through untouched.
const CURRENCY_SYMBOL: &str = "$";

/// Outcome of projecting a gateway payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartProjection {
    /// The payload had zero line nodes: the remote cart is empty or the
    /// gateway session expired. The two are indistinguishable on the wire and
    /// are handled identically (full session teardown).
    Empty,
    /// A renderable cart.
    Ready(CartSnapshot),
}

/// Project a raw gateway payload into the view model.
///
/// Lines without a resolvable product reference are skipped with a warning
/// rather than failing the whole cart; `item_count` falls back to the sum of
/// projected line quantities when the gateway omits it.
#[must_use]
pub fn project_cart(payload: &CartPayload, placeholder_image: &str) -> CartProjection {
    if payload.contents.nodes.is_empty() {
        return CartProjection::Empty;
    }

    let lines: Vec<CartLine> = payload
        .contents
        .nodes
        .iter()
        .filter_map(|node| project_line(node, placeholder_image))
        .collect();

    let item_count = payload
        .contents
        .item_count
        .unwrap_or_else(|| lines.iter().map(|line| line.quantity).sum());

    CartProjection::Ready(CartSnapshot {
        lines,
        item_count,
        subtotal: payload.subtotal.clone(),
        total: payload.total.clone(),
    })
}

fn project_line(node: &CartItemNode, placeholder_image: &str) -> Option<CartLine> {
    let Some(product) = node.product.as_ref().and_then(|edge| edge.node.as_ref()) else {
        warn!(key = %node.key, "skipping cart line without product data");
        return None;
    };

    let variation = node.variation.as_ref().and_then(|edge| edge.node.as_ref());

    let image = product
        .image
        .as_ref()
        .and_then(|image| image.source_url.clone())
        .unwrap_or_else(|| placeholder_image.to_string());

    let derived_unit_price = node
        .total
        .as_deref()
        .and_then(|total| unit_price(total, node.quantity).ok())
        .map(|amount| format_amount(amount, CURRENCY_SYMBOL));

    Some(CartLine {
        key: LineKey::from(node.key.as_str()),
        product_id: ProductId::new(product.database_id),
        variation_id: variation.map(|v| VariationId::new(v.database_id)),
        name: variation
            .and_then(|v| v.name.clone())
            .or_else(|| product.name.clone()),
        image,
        quantity: node.quantity,
        unit_price: derived_unit_price,
        subtotal: node.subtotal.clone(),
        total: node.total.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLACEHOLDER: &str = "/static/img/placeholder.png";

    fn payload(value: serde_json::Value) -> CartPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_project_full_cart() {
        let payload = payload(json!({
            "contents": {
                "itemCount": 3,
                "nodes": [{
                    "key": "abc123",
                    "quantity": 3,
                    "subtotal": "$30.00",
                    "total": "$30.00",
                    "product": {"node": {
                        "databaseId": 42,
                        "name": "Dried Lavender",
                        "image": {"sourceUrl": "https://cdn.example/lavender.jpg"}
                    }},
                    "variation": null
                }]
            },
            "subtotal": "$30.00",
            "total": "$33.50"
        }));

        let CartProjection::Ready(snapshot) = project_cart(&payload, PLACEHOLDER) else {
            panic!("expected a ready cart");
        };
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.item_count, 3);
        assert_eq!(snapshot.total.as_deref(), Some("$33.50"));

        let line = &snapshot.lines[0];
        assert_eq!(line.key, LineKey::from("abc123"));
        assert_eq!(line.product_id, ProductId::new(42));
        assert_eq!(line.name.as_deref(), Some("Dried Lavender"));
        assert_eq!(line.image, "https://cdn.example/lavender.jpg");
        assert_eq!(line.unit_price.as_deref(), Some("$10.00"));
    }

    #[test]
    fn test_empty_payload_projects_empty() {
        let payload = payload(json!({
            "contents": {"itemCount": 0, "nodes": []},
            "subtotal": "$0.00",
            "total": "$0.00"
        }));
        assert_eq!(project_cart(&payload, PLACEHOLDER), CartProjection::Empty);
    }

    #[test]
    fn test_line_without_product_is_skipped() {
        let payload = payload(json!({
            "contents": {
                "itemCount": null,
                "nodes": [
                    {"key": "good", "quantity": 2, "subtotal": "$4.00", "total": "$4.00",
                     "product": {"node": {"databaseId": 7, "name": "Soap", "image": null}},
                     "variation": null},
                    {"key": "broken", "quantity": 1, "subtotal": null, "total": null,
                     "product": {"node": null}, "variation": null}
                ]
            },
            "subtotal": null,
            "total": null
        }));

        let CartProjection::Ready(snapshot) = project_cart(&payload, PLACEHOLDER) else {
            panic!("expected a ready cart");
        };
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].key, LineKey::from("good"));
        // itemCount absent: falls back to sum of surviving line quantities
        assert_eq!(snapshot.item_count, 2);
    }

    #[test]
    fn test_missing_image_uses_placeholder() {
        let payload = payload(json!({
            "contents": {
                "itemCount": 1,
                "nodes": [{
                    "key": "k", "quantity": 1, "subtotal": "$9.00", "total": "$9.00",
                    "product": {"node": {"databaseId": 9, "name": "Candle", "image": null}},
                    "variation": null
                }]
            },
            "subtotal": "$9.00",
            "total": "$9.00"
        }));

        let CartProjection::Ready(snapshot) = project_cart(&payload, PLACEHOLDER) else {
            panic!("expected a ready cart");
        };
        assert_eq!(snapshot.lines[0].image, PLACEHOLDER);
    }

    #[test]
    fn test_variation_name_and_id_win() {
        let payload = payload(json!({
            "contents": {
                "itemCount": 1,
                "nodes": [{
                    "key": "k", "quantity": 1, "subtotal": "$12.00", "total": "$12.00",
                    "product": {"node": {"databaseId": 11, "name": "Tea", "image": null}},
                    "variation": {"node": {"databaseId": 110, "name": "Tea - Loose Leaf"}}
                }]
            },
            "subtotal": "$12.00",
            "total": "$12.00"
        }));

        let CartProjection::Ready(snapshot) = project_cart(&payload, PLACEHOLDER) else {
            panic!("expected a ready cart");
        };
        assert_eq!(snapshot.lines[0].variation_id, Some(VariationId::new(110)));
        assert_eq!(snapshot.lines[0].name.as_deref(), Some("Tea - Loose Leaf"));
    }

    #[test]
    fn test_unparseable_total_leaves_unit_price_empty() {
        let payload = payload(json!({
            "contents": {
                "itemCount": 1,
                "nodes": [{
                    "key": "k", "quantity": 2, "subtotal": "free", "total": "free",
                    "product": {"node": {"databaseId": 5, "name": "Sample", "image": null}},
                    "variation": null
                }]
            },
            "subtotal": null,
            "total": null
        }));

        let CartProjection::Ready(snapshot) = project_cart(&payload, PLACEHOLDER) else {
            panic!("expected a ready cart");
        };
        assert_eq!(snapshot.lines[0].unit_price, None);
        assert_eq!(snapshot.lines[0].total.as_deref(), Some("free"));
    }
}
