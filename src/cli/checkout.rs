//! Checkout widget for the terminal
//!
//! The hosted checkout runs in a browser; the terminal only collects the
//! three values it hands back. Values passed as flags are used as-is and
//! anything missing is asked for on stdin.

use crate::payment::{CheckoutOutcome, CheckoutRequest, CheckoutWidget};
use crate::types::CheckoutResponse;
use async_trait::async_trait;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Default)]
pub(crate) struct TerminalCheckout {
    pub(crate) payment_id: Option<String>,
    pub(crate) order_id: Option<String>,
    pub(crate) signature: Option<String>,
}

fn prompt(label: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}: ", label)?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

impl TerminalCheckout {
    fn collect(&self, request: &CheckoutRequest) -> io::Result<Option<CheckoutResponse>> {
        eprintln!(
            "{}: {} - {} {:.2}",
            request.name,
            request.description,
            request.currency,
            request.amount as f64 / 100.0
        );
        match &request.order_id {
            Some(order_id) => eprintln!("Order: {} (key {})", order_id, request.key_id),
            None => eprintln!("No order could be created; the payment cannot be verified without one."),
        }

        let payment_id = match &self.payment_id {
            Some(id) => id.clone(),
            None => prompt("Payment id (empty to cancel)")?,
        };
        if payment_id.is_empty() {
            return Ok(None);
        }

        let order_id = match self.order_id.clone().or_else(|| request.order_id.clone()) {
            Some(id) => id,
            None => prompt("Order id")?,
        };
        let signature = match &self.signature {
            Some(signature) => signature.clone(),
            None => prompt("Signature")?,
        };

        Ok(Some(CheckoutResponse {
            payment_id,
            order_id,
            signature,
        }))
    }
}

#[async_trait]
impl CheckoutWidget for TerminalCheckout {
    async fn open(&self, request: CheckoutRequest) -> CheckoutOutcome {
        let widget = self.clone();
        let collected = tokio::task::spawn_blocking(move || widget.collect(&request)).await;

        match collected {
            Ok(Ok(Some(response))) => CheckoutOutcome::Completed(response),
            Ok(Ok(None)) => CheckoutOutcome::Dismissed,
            Ok(Err(e)) => CheckoutOutcome::Failed {
                reason: format!("Could not read checkout details: {}", e),
            },
            Err(e) => CheckoutOutcome::Failed {
                reason: format!("Checkout prompt failed: {}", e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flags_skip_prompts() {
        let widget = TerminalCheckout {
            payment_id: Some("pay_1".to_string()),
            order_id: None,
            signature: Some("sig".to_string()),
        };
        let request = CheckoutRequest {
            key_id: "rzp_test".to_string(),
            amount: 5000,
            currency: "INR".to_string(),
            order_id: Some("order_1".to_string()),
            name: "transparent.pics".to_string(),
            description: "Premium Background Removal".to_string(),
        };

        match widget.open(request).await {
            CheckoutOutcome::Completed(response) => {
                assert_eq!(response.payment_id, "pay_1");
                assert_eq!(response.order_id, "order_1");
                assert_eq!(response.signature, "sig");
            },
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
