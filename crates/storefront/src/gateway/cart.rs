//! Cart gateway GraphQL client.
//!
//! Cart state lives at the gateway; every mutation here is followed by a full
//! `GetCart` refetch at the sequencer layer, so none of these calls are
//! cached and no response other than `GetCart` is ever projected into the
//! local store.

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use larkspur_core::SessionToken;

use crate::config::CommerceGatewayConfig;

use super::types::{AddToCartInput, CartPayload, LineQuantityInput};
use super::{GatewayError, GraphQLError};

/// Header carrying the opaque cart session token on GraphQL calls.
///
/// The gateway echoes a (possibly refreshed) token back in the same header on
/// mutation responses; callers must adopt it.
pub const CART_SESSION_HEADER: &str = "cart-session";

const GET_CART_QUERY: &str = r"
query GetCart {
  cart {
    contents {
      itemCount
      nodes {
        key
        quantity
        subtotal
        total
        product { node { databaseId name image { sourceUrl } } }
        variation { node { databaseId name } }
      }
    }
    subtotal
    total
  }
}
";

const ADD_TO_CART_MUTATION: &str = r"
mutation AddToCart($input: AddToCartInput!) {
  addToCart(input: $input) {
    cartItem { key }
  }
}
";

const UPDATE_ITEM_QUANTITIES_MUTATION: &str = r"
mutation UpdateItemQuantities($input: UpdateItemQuantitiesInput!) {
  updateItemQuantities(input: $input) {
    items { key }
  }
}
";

/// A gateway response paired with the session token the gateway issued or
/// refreshed on this round-trip, if any.
#[derive(Debug)]
pub struct GatewayReply<T> {
    pub data: T,
    pub session_token: Option<SessionToken>,
}

/// Operations the cart mutation sequencer needs from the gateway.
///
/// The HTTP client implements this; tests substitute a scripted double so the
/// sequencing protocol can be verified without a network.
pub trait CartGateway: Send + Sync {
    /// Fetch the full current cart, or `None` if the gateway has no cart for
    /// this session.
    fn get_cart(
        &self,
        token: Option<&SessionToken>,
    ) -> impl Future<Output = Result<GatewayReply<Option<CartPayload>>, GatewayError>> + Send;

    /// Add an item to the cart. The response payload is intentionally
    /// discarded; only the follow-up refetch is trusted.
    fn add_to_cart(
        &self,
        token: Option<&SessionToken>,
        input: &AddToCartInput,
        client_mutation_id: &str,
    ) -> impl Future<Output = Result<GatewayReply<()>, GatewayError>> + Send;

    /// Set quantities for the full list of lines. Quantity zero removes the
    /// line. Omitted lines are left unspecified by the gateway, which is why
    /// callers always send the complete reconstructed list.
    fn update_item_quantities(
        &self,
        token: Option<&SessionToken>,
        items: &[LineQuantityInput],
        client_mutation_id: &str,
    ) -> impl Future<Output = Result<GatewayReply<()>, GatewayError>> + Send;
}

// =============================================================================
// CartGatewayClient
// =============================================================================

/// HTTP client for the commerce gateway's GraphQL cart API.
#[derive(Clone)]
pub struct CartGatewayClient {
    inner: Arc<CartGatewayClientInner>,
}

struct CartGatewayClientInner {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct GraphQLResponse {
    data: Option<serde_json::Value>,
    errors: Option<Vec<RawGraphQLError>>,
}

#[derive(Deserialize)]
struct RawGraphQLError {
    message: String,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

impl CartGatewayClient {
    /// Create a new cart gateway client.
    #[must_use]
    pub fn new(config: &CommerceGatewayConfig) -> Self {
        Self {
            inner: Arc::new(CartGatewayClientInner {
                client: reqwest::Client::new(),
                endpoint: config.graphql_endpoint.clone(),
            }),
        }
    }

    /// Execute a GraphQL document and return the `data` object plus any
    /// session token the gateway issued on this round-trip.
    async fn execute(
        &self,
        token: Option<&SessionToken>,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<(serde_json::Value, Option<SessionToken>), GatewayError> {
        let mut request = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }));

        if let Some(token) = token {
            request = request.header(CART_SESSION_HEADER, token.expose());
        }

        let response = request.send().await?;

        let issued_token = response
            .headers()
            .get(CART_SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|raw| SessionToken::new(raw.to_string()));

        let status = response.status();

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "cart gateway returned non-success status"
            );
            return Err(GatewayError::GraphQL(vec![GraphQLError {
                message: format!(
                    "HTTP {status}: {}",
                    response_text.chars().take(200).collect::<String>()
                ),
                path: vec![],
            }]));
        }

        let response: GraphQLResponse = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "failed to parse cart gateway response"
                );
                return Err(GatewayError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(count = errors.len(), "GraphQL errors in response");
            return Err(GatewayError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        path: e.path,
                    })
                    .collect(),
            ));
        }

        let data = response.data.ok_or_else(|| {
            GatewayError::Malformed("response has no data and no errors".to_string())
        })?;

        Ok((data, issued_token))
    }
}

impl CartGateway for CartGatewayClient {
    fn get_cart(
        &self,
        token: Option<&SessionToken>,
    ) -> impl Future<Output = Result<GatewayReply<Option<CartPayload>>, GatewayError>> + Send {
        async move {
            let (data, session_token) = self
                .execute(token, GET_CART_QUERY, serde_json::Value::Null)
                .await?;

            let cart = match data.get("cart") {
                None | Some(serde_json::Value::Null) => None,
                Some(value) => Some(serde_json::from_value::<CartPayload>(value.clone())?),
            };

            Ok(GatewayReply {
                data: cart,
                session_token,
            })
        }
    }

    fn add_to_cart(
        &self,
        token: Option<&SessionToken>,
        input: &AddToCartInput,
        client_mutation_id: &str,
    ) -> impl Future<Output = Result<GatewayReply<()>, GatewayError>> + Send {
        let variables = json!({
            "input": {
                "clientMutationId": client_mutation_id,
                "productId": input.product_id,
                "variationId": input.variation_id,
                "quantity": input.quantity,
            }
        });

        async move {
            let (data, session_token) =
                self.execute(token, ADD_TO_CART_MUTATION, variables).await?;

            // Acceptance check only; the payload itself is never trusted as
            // the new source of truth.
            if data.get("addToCart").is_none_or(serde_json::Value::is_null) {
                return Err(GatewayError::Malformed(
                    "addToCart returned no payload".to_string(),
                ));
            }

            Ok(GatewayReply {
                data: (),
                session_token,
            })
        }
    }

    fn update_item_quantities(
        &self,
        token: Option<&SessionToken>,
        items: &[LineQuantityInput],
        client_mutation_id: &str,
    ) -> impl Future<Output = Result<GatewayReply<()>, GatewayError>> + Send {
        let variables = json!({
            "input": {
                "clientMutationId": client_mutation_id,
                "items": items,
            }
        });

        async move {
            let (data, session_token) = self
                .execute(token, UPDATE_ITEM_QUANTITIES_MUTATION, variables)
                .await?;

            if data
                .get("updateItemQuantities")
                .is_none_or(serde_json::Value::is_null)
            {
                return Err(GatewayError::Malformed(
                    "updateItemQuantities returned no payload".to_string(),
                ));
            }

            Ok(GatewayReply {
                data: (),
                session_token,
            })
        }
    }
}
