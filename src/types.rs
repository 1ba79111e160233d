//! Data types shared by the client flow and the relay server

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size hint forwarded to the removal provider alongside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizeHint {
    /// Let the provider pick the output size
    #[default]
    Auto,
    /// Small preview-sized output
    Preview,
}

impl SizeHint {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Preview => "preview",
        }
    }
}

impl fmt::Display for SizeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file the user selected, held in memory for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Raw file contents
    pub bytes: Bytes,
    /// MIME type reported for the file (may be empty when unknown)
    pub mime_type: String,
    /// Original file name
    pub file_name: String,
}

impl UploadedFile {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }
}

/// The downscaled, re-encoded image attached to one outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Bytes,
    /// `image/png` or `image/jpeg`
    pub mime_type: &'static str,
    /// File name used for the multipart part
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub size_hint: SizeHint,
}

/// Binary image returned by the removal API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultImage {
    pub bytes: Bytes,
    pub content_type: String,
}

impl ResultImage {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }
}

/// Order created by the payment provider. Only the fields the checkout needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
    /// Amount in the currency's smallest unit (paise for INR)
    pub amount: u64,
    pub currency: String,
}

/// Parameters returned by the checkout widget on successful payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub payment_id: String,
    pub order_id: String,
    pub signature: String,
}

/// Body of `POST /create-order`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
}

/// Body of `POST /verify-payment`; every field is optional on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl From<&CheckoutResponse> for VerifyPaymentRequest {
    fn from(response: &CheckoutResponse) -> Self {
        Self {
            payment_id: Some(response.payment_id.clone()),
            order_id: Some(response.order_id.clone()),
            signature: Some(response.signature.clone()),
        }
    }
}

/// Response of `POST /verify-payment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Write-once audit record of a raw upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImageRecord {
    pub data: Bytes,
    pub created_at: DateTime<Utc>,
}

impl StoredImageRecord {
    #[must_use]
    pub fn now(data: Bytes) -> Self {
        Self {
            data,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_hint_wire_names() {
        assert_eq!(SizeHint::Auto.to_string(), "auto");
        assert_eq!(SizeHint::Preview.as_str(), "preview");
        let parsed: SizeHint = serde_json::from_str("\"preview\"").unwrap();
        assert_eq!(parsed, SizeHint::Preview);
    }

    #[test]
    fn test_verify_request_tolerates_missing_fields() {
        let parsed: VerifyPaymentRequest =
            serde_json::from_str(r#"{"payment_id":"pay_1"}"#).unwrap();
        assert_eq!(parsed.payment_id.as_deref(), Some("pay_1"));
        assert!(parsed.order_id.is_none());
        assert!(parsed.signature.is_none());
    }

    #[test]
    fn test_verify_response_omits_empty_error() {
        let body = serde_json::to_string(&VerifyPaymentResponse {
            verified: true,
            error: None,
        })
        .unwrap();
        assert_eq!(body, r#"{"verified":true}"#);
    }

    #[test]
    fn test_payment_order_ignores_extra_provider_fields() {
        let order: PaymentOrder = serde_json::from_str(
            r#"{"id":"order_9A33XWu170gUtm","entity":"order","amount":5000,"currency":"INR","status":"created"}"#,
        )
        .unwrap();
        assert_eq!(order.id, "order_9A33XWu170gUtm");
        assert_eq!(order.amount, 5000);
    }
}
