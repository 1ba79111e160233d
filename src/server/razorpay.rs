//! Order creation against the payment provider's REST API

use crate::error::{RelayError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

/// Creates payment orders. Implementations return the provider's order object verbatim.
#[async_trait]
pub trait OrderProvider: Send + Sync {
    async fn create_order(&self, amount: u64, currency: &str, receipt: &str) -> Result<serde_json::Value>;
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
}

/// Razorpay orders API, authenticated with the key id and secret
#[derive(Debug, Clone)]
pub struct RazorpayProvider {
    http: Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayProvider {
    pub fn new(http: Client, api_base: impl Into<String>, key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    fn orders_url(&self) -> String {
        format!("{}/v1/orders", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl OrderProvider for RazorpayProvider {
    #[instrument(skip(self))]
    async fn create_order(&self, amount: u64, currency: &str, receipt: &str) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(self.orders_url())
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount,
                currency,
                receipt,
            })
            .send()
            .await
            .map_err(|e| RelayError::network_error("Order request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::network_error("Failed to read order response", e))?;

        if !status.is_success() {
            return Err(RelayError::upstream(status.as_u16(), provider_error_message(&body)));
        }

        debug!("Order created for receipt {}", receipt);
        serde_json::from_str(&body).map_err(|e| RelayError::internal(format!("Invalid order response: {}", e)))
    }
}

/// `{"error": {"description": ...}}` is the provider's error shape
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/description")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| crate::client::error_message_from_body(body, Some("Failed to create order")))
}
