//! Premium checkout: order creation, checkout widget and server-side verification
//!
//! The relay creates the order and checks the signature; the client only
//! drives the widget in between. The client's own view of a successful
//! payment is never trusted on its own.

use crate::{
    client::error_message_from_body,
    config::ClientConfig,
    error::{RelayError, Result},
    types::{CheckoutResponse, PaymentOrder, VerifyPaymentRequest, VerifyPaymentResponse},
};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Parameters the checkout widget is opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Public checkout key id
    pub key_id: String,
    pub amount: u64,
    pub currency: String,
    /// Absent when the relay could not create an order
    pub order_id: Option<String>,
    pub name: String,
    pub description: String,
}

/// How the user left the checkout widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Completed(CheckoutResponse),
    Failed { reason: String },
    Dismissed,
}

/// Third-party checkout UI
#[async_trait]
pub trait CheckoutWidget: Send + Sync {
    /// Show the checkout and wait for the user to finish with it
    async fn open(&self, request: CheckoutRequest) -> CheckoutOutcome;
}

/// JSON calls to the relay's payment endpoints
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    create_order_url: String,
    verify_payment_url: String,
}

impl RelayClient {
    #[must_use]
    pub fn new(http: Client, config: &ClientConfig) -> Self {
        Self {
            http,
            create_order_url: config.relay_endpoint("/create-order"),
            verify_payment_url: config.relay_endpoint("/verify-payment"),
        }
    }

    /// Ask the relay to create a payment order
    ///
    /// # Errors
    /// - `Upstream` when the relay rejects the request
    /// - `Network` when the relay cannot be reached or answers garbage
    #[instrument(skip(self))]
    pub async fn create_order(&self, amount: u64) -> Result<PaymentOrder> {
        let response = self
            .http
            .post(&self.create_order_url)
            .json(&serde_json::json!({ "amount": amount }))
            .send()
            .await
            .map_err(|e| RelayError::network_error("Order creation request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::upstream(
                status.as_u16(),
                error_message_from_body(&body, status.canonical_reason()),
            ));
        }

        response
            .json::<PaymentOrder>()
            .await
            .map_err(|e| RelayError::network_error("Invalid order response", e))
    }

    /// Forward the checkout result for signature verification
    ///
    /// # Errors
    /// - `VerificationUnavailable` when the call fails or the relay answers non-2xx
    #[instrument(skip(self, checkout), fields(order_id = %checkout.order_id))]
    pub async fn verify_payment(&self, checkout: &CheckoutResponse) -> Result<bool> {
        let response = self
            .http
            .post(&self.verify_payment_url)
            .json(&VerifyPaymentRequest::from(checkout))
            .send()
            .await
            .map_err(|e| RelayError::VerificationUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::VerificationUnavailable(format!(
                "verify endpoint returned {}: {}",
                status.as_u16(),
                error_message_from_body(&body, status.canonical_reason())
            )));
        }

        let verdict = response
            .json::<VerifyPaymentResponse>()
            .await
            .map_err(|e| RelayError::VerificationUnavailable(e.to_string()))?;
        if !verdict.verified {
            warn!(
                "Relay rejected payment: {}",
                verdict.error.as_deref().unwrap_or("no reason given")
            );
        }
        Ok(verdict.verified)
    }
}

/// A checkout the relay has confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    /// `None` for an order-less checkout
    pub order: Option<PaymentOrder>,
    pub checkout: CheckoutResponse,
}

/// Runs the premium purchase from order creation to verification
pub struct PaymentInitiator {
    relay: RelayClient,
    widget: Arc<dyn CheckoutWidget>,
    amount: u64,
    currency: String,
    key_id: String,
    merchant_name: String,
    description: String,
}

impl PaymentInitiator {
    #[must_use]
    pub fn new(relay: RelayClient, widget: Arc<dyn CheckoutWidget>, config: &ClientConfig) -> Self {
        Self {
            relay,
            widget,
            amount: config.premium_amount,
            currency: config.currency.clone(),
            key_id: config.checkout_key_id.clone(),
            merchant_name: config.merchant_name.clone(),
            description: config.checkout_description.clone(),
        }
    }

    /// Create an order, run the checkout and verify it with the relay
    ///
    /// When the order cannot be created the checkout still opens without an
    /// order id, using the configured amount and currency.
    ///
    /// # Errors
    /// - `PaymentFailed` / `PaymentCancelled` from the widget
    /// - `SignatureMismatch` when the relay answers `verified: false`
    /// - `VerificationUnavailable` when the verification call fails
    #[instrument(skip(self))]
    pub async fn purchase(&self) -> Result<VerifiedPayment> {
        let order = match self.relay.create_order(self.amount).await {
            Ok(order) => {
                info!("Created order {} for {} {}", order.id, order.amount, order.currency);
                Some(order)
            },
            Err(e) => {
                warn!("Order creation failed, continuing without an order: {}", e);
                None
            },
        };

        let request = CheckoutRequest {
            key_id: self.key_id.clone(),
            amount: order.as_ref().map_or(self.amount, |o| o.amount),
            currency: order
                .as_ref()
                .map_or_else(|| self.currency.clone(), |o| o.currency.clone()),
            order_id: order.as_ref().map(|o| o.id.clone()),
            name: self.merchant_name.clone(),
            description: self.description.clone(),
        };

        let checkout = match self.widget.open(request).await {
            CheckoutOutcome::Completed(checkout) => checkout,
            CheckoutOutcome::Failed { reason } => {
                warn!("Checkout failed: {}", reason);
                return Err(RelayError::PaymentFailed(reason));
            },
            CheckoutOutcome::Dismissed => return Err(RelayError::PaymentCancelled),
        };

        if self.relay.verify_payment(&checkout).await? {
            info!("Payment {} verified", checkout.payment_id);
            Ok(VerifiedPayment { order, checkout })
        } else {
            Err(RelayError::SignatureMismatch)
        }
    }
}

impl std::fmt::Debug for PaymentInitiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentInitiator")
            .field("relay", &self.relay)
            .field("amount", &self.amount)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}
