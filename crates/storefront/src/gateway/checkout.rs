//! Checkout REST client.
//!
//! Stage submissions (`update-customer`, `select-shipping-rate`, order
//! placement) are never cached. The payment gateway list changes rarely, so
//! it is cached with `moka` for 5 minutes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;

use larkspur_core::SessionToken;

use crate::checkout::types::{CustomerUpdate, OrderOutcome, OrderRequest, PaymentGateway};
use crate::config::CommerceGatewayConfig;

use super::GatewayError;

const PAYMENT_GATEWAYS_CACHE_KEY: &str = "payment-gateways";

/// Operations the checkout session needs from the gateway.
///
/// The HTTP client implements this; tests substitute a scripted double so
/// stage transitions can be verified without a network.
pub trait CheckoutApi: Send + Sync {
    /// Submit shipping/billing addresses. Returns the confirmed cart state
    /// (including offered shipping rates) as an opaque blob.
    fn update_customer(
        &self,
        token: Option<&SessionToken>,
        update: &CustomerUpdate,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send;

    /// Select a shipping rate. Returns updated totals as an opaque blob.
    fn select_shipping_rate(
        &self,
        token: Option<&SessionToken>,
        rate_id: &str,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send;

    /// Place the order.
    fn place_order(
        &self,
        token: Option<&SessionToken>,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderOutcome, GatewayError>> + Send;

    /// List available payment methods.
    fn payment_gateways(
        &self,
        token: Option<&SessionToken>,
    ) -> impl Future<Output = Result<Vec<PaymentGateway>, GatewayError>> + Send;
}

// =============================================================================
// CheckoutClient
// =============================================================================

/// HTTP client for the commerce gateway's REST checkout API.
#[derive(Clone)]
pub struct CheckoutClient {
    inner: Arc<CheckoutClientInner>,
}

struct CheckoutClientInner {
    client: reqwest::Client,
    base_url: String,
    gateway_cache: Cache<&'static str, Vec<PaymentGateway>>,
}

impl CheckoutClient {
    /// Create a new checkout client.
    #[must_use]
    pub fn new(config: &CommerceGatewayConfig) -> Self {
        let gateway_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CheckoutClientInner {
                client: reqwest::Client::new(),
                base_url: config.checkout_base_url.trim_end_matches('/').to_string(),
                gateway_cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// POST a JSON body and parse the JSON response.
    ///
    /// Non-2xx responses become [`GatewayError::UserError`] when the error
    /// body carries a `message` field, otherwise a generic user error.
    async fn post(
        &self,
        token: Option<&SessionToken>,
        path: &str,
        body: &Value,
    ) -> Result<Value, GatewayError> {
        let mut request = self.inner.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&response_text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from));
            tracing::warn!(
                status = %status,
                path = %path,
                "checkout call rejected"
            );
            return Err(GatewayError::UserError(message.unwrap_or_else(|| {
                "Something went wrong. Please try again.".to_string()
            })));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "failed to parse checkout response"
            );
            GatewayError::Parse(e)
        })
    }

    async fn get(
        &self,
        token: Option<&SessionToken>,
        path: &str,
    ) -> Result<Value, GatewayError> {
        let mut request = self.inner.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::UserError(
                "Something went wrong. Please try again.".to_string(),
            ));
        }

        Ok(serde_json::from_str(&response_text)?)
    }
}

impl CheckoutApi for CheckoutClient {
    fn update_customer(
        &self,
        token: Option<&SessionToken>,
        update: &CustomerUpdate,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        let body = serde_json::json!({
            "shipping_address": update.shipping_address,
            "billing_address": update.billing_address,
        });
        async move { self.post(token, "/checkout/cart/update-customer", &body).await }
    }

    fn select_shipping_rate(
        &self,
        token: Option<&SessionToken>,
        rate_id: &str,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        let body = serde_json::json!({ "rate_id": rate_id });
        async move {
            self.post(token, "/checkout/cart/select-shipping-rate", &body)
                .await
        }
    }

    fn place_order(
        &self,
        token: Option<&SessionToken>,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderOutcome, GatewayError>> + Send {
        let body = serde_json::json!({
            "payment_method": order.payment_method,
            "billing_address": order.billing_address,
            "shipping_address": order.shipping_address,
        });
        async move {
            let response = self.post(token, "/checkout", &body).await?;

            match response.get("redirect_url").and_then(Value::as_str) {
                Some(url) if !url.is_empty() => Ok(OrderOutcome::Redirect {
                    url: url.to_string(),
                }),
                _ => Ok(OrderOutcome::Confirmed(response)),
            }
        }
    }

    fn payment_gateways(
        &self,
        token: Option<&SessionToken>,
    ) -> impl Future<Output = Result<Vec<PaymentGateway>, GatewayError>> + Send {
        async move {
            if let Some(cached) = self.inner.gateway_cache.get(PAYMENT_GATEWAYS_CACHE_KEY).await {
                tracing::debug!("cache hit for payment gateways");
                return Ok(cached);
            }

            let response = self.get(token, "/payment-gateways").await?;
            let gateways: Vec<PaymentGateway> = serde_json::from_value(response)?;

            self.inner
                .gateway_cache
                .insert(PAYMENT_GATEWAYS_CACHE_KEY, gateways.clone())
                .await;

            Ok(gateways)
        }
    }
}
