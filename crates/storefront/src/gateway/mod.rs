//! Commerce gateway clients.
//!
//! # Architecture
//!
//! - The gateway is the source of truth for cart contents - NO local
//!   computation of totals, direct API calls only
//! - Cart operations go over the gateway's GraphQL endpoint; queries are
//!   hand-written documents executed with `reqwest` (the gateway schema is
//!   not vendored, so there is no codegen step)
//! - Checkout operations go over the gateway's REST endpoints
//! - Cart and checkout calls are never cached; the payment gateway list is
//!   cached in-memory via `moka` (5 minute TTL)
//!
//! # Credentials
//!
//! The gateway issues an opaque session token tying a visitor to their remote
//! cart. The client sends it on GraphQL calls in the `Cart-Session` header and
//! on REST calls as an `Authorization: Bearer` header, and adopts a refreshed
//! token whenever a mutation response carries one. Calls without a token are
//! guest calls.

pub mod cart;
pub mod checkout;
pub mod types;

pub use cart::{CartGateway, CartGatewayClient};
pub use checkout::{CheckoutApi, CheckoutClient};

use thiserror::Error;

/// Errors that can occur when interacting with the commerce gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Gateway rejected the operation with a user-facing message.
    #[error("User error: {0}")]
    UserError(String),

    /// Response was missing an expected field.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Message suitable for inline display next to the failed action.
    ///
    /// Uses the gateway-provided message when one exists, otherwise a generic
    /// fallback - transport and parse details are never shown to shoppers.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UserError(message) => message.clone(),
            Self::GraphQL(errors) => errors
                .iter()
                .find(|e| !e.message.is_empty() && !e.message.starts_with("HTTP "))
                .map_or_else(
                    || "Something went wrong. Please try again.".to_string(),
                    |e| e.message.clone(),
                ),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// A GraphQL error returned by the gateway.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                path: vec![],
            },
            GraphQLError {
                message: "Invalid key".to_string(),
                path: vec![],
            },
        ];
        let err = GatewayError::GraphQL(errors);
        assert_eq!(err.to_string(), "GraphQL errors: Field not found; Invalid key");
    }

    #[test]
    fn test_graphql_error_path_only() {
        let errors = vec![GraphQLError {
            message: String::new(),
            path: vec![
                serde_json::Value::String("cart".to_string()),
                serde_json::Value::Number(0.into()),
            ],
        }];
        let err = GatewayError::GraphQL(errors);
        assert_eq!(err.to_string(), "GraphQL errors: path: cart.0");
    }

    #[test]
    fn test_graphql_error_empty_vec() {
        let err = GatewayError::GraphQL(vec![]);
        assert_eq!(err.to_string(), "GraphQL errors: (no error details provided)");
    }

    #[test]
    fn test_user_message_passthrough() {
        let err = GatewayError::UserError("Out of stock".to_string());
        assert_eq!(err.user_message(), "Out of stock");
    }

    #[test]
    fn test_user_message_generic_for_transport() {
        let err = GatewayError::Malformed("no cart field".to_string());
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }
}
