//! Submission client for the removal API and the relay
//!
//! Both tiers go through [`SubmissionClient::submit`]. They differ only in
//! the [`RemovalTarget`] the request is sent to, which comes from
//! [`ClientConfig`].

use crate::{
    config::{ClientConfig, RemovalTarget, Tier},
    error::{RelayError, Result},
    types::{EncodedImage, ResultImage},
};
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, warn};

/// Content type assumed when the removal API omits one
pub const DEFAULT_RESULT_CONTENT_TYPE: &str = "image/png";

/// Sends encoded images for background removal, one request at a time
#[derive(Debug)]
pub struct SubmissionClient {
    http: Client,
    config: ClientConfig,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the submission ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SubmissionClient {
    /// Create a submission client with its own HTTP client
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RelayError::network_error("Failed to create HTTP client", e))?;
        Ok(Self::with_http_client(http, config))
    }

    /// Create a submission client sharing an existing HTTP client
    #[must_use]
    pub fn with_http_client(http: Client, config: ClientConfig) -> Self {
        Self {
            http,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a submission is currently awaiting its response
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit an encoded image and wait for the processed result
    ///
    /// # Errors
    /// - `Busy` if another submission from this client is still pending
    /// - `MissingCredential` if the free tier has no API key configured
    /// - `Upstream` for any non-success response, carrying the provider's message
    /// - `Network` for transport failures
    #[instrument(skip(self, image), fields(file = %image.file_name, bytes = image.bytes.len()))]
    pub async fn submit(&self, tier: Tier, image: EncodedImage) -> Result<ResultImage> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected re-entrant submission");
            return Err(RelayError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let target = self.config.target(tier);
        if tier == Tier::Free && target.api_key.is_none() {
            return Err(RelayError::MissingCredential("free-tier API key"));
        }

        info!("Submitting {} image to {}", tier, target.url);
        let response = self.send(&target, image).await?;
        Self::read_result(response).await
    }

    async fn send(&self, target: &RemovalTarget, image: EncodedImage) -> Result<Response> {
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name)
            .mime_str(image.mime_type)
            .map_err(|e| RelayError::network_error("Invalid upload content type", e))?;
        let form = Form::new()
            .part("file", part)
            .text("size", image.size_hint.as_str());

        let mut request = self.http.post(&target.url).multipart(form);
        if let Some(key) = &target.api_key {
            request = request.header(target.api_key_header.as_str(), key.as_str());
        }

        request
            .send()
            .await
            .map_err(|e| RelayError::network_error(format!("Request to {} failed", target.url), e))
    }

    async fn read_result(response: Response) -> Result<ResultImage> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::upstream(
                status.as_u16(),
                error_message_from_body(&body, status.canonical_reason()),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_RESULT_CONTENT_TYPE)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::network_error("Failed to read result image", e))?;

        Ok(ResultImage::new(bytes, content_type))
    }
}

/// Extract the message from an error body
///
/// The removal API answers `{"detail": ...}`, the relay answers `{"error": ...}`;
/// anything else is returned as text.
#[must_use]
pub fn error_message_from_body(body: &str, fallback: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {},
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.unwrap_or("Unknown error").to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_detail() {
        assert_eq!(
            error_message_from_body(r#"{"detail":"Invalid API key"}"#, None),
            "Invalid API key"
        );
    }

    #[test]
    fn test_error_message_from_relay_error() {
        assert_eq!(
            error_message_from_body(r#"{"error":"file required"}"#, None),
            "file required"
        );
    }

    #[test]
    fn test_error_message_structured_detail() {
        let message = error_message_from_body(r#"{"detail":[{"msg":"field required"}]}"#, None);
        assert!(message.contains("field required"));
    }

    #[test]
    fn test_error_message_plain_text_and_empty() {
        assert_eq!(error_message_from_body("Bad gateway\n", None), "Bad gateway");
        assert_eq!(error_message_from_body("", Some("Forbidden")), "Forbidden");
        assert_eq!(error_message_from_body("  ", None), "Unknown error");
    }

    #[tokio::test]
    async fn test_free_tier_requires_key() {
        let client = SubmissionClient::new(ClientConfig::default()).unwrap();
        let image = EncodedImage {
            bytes: bytes::Bytes::from_static(b"jpeg"),
            mime_type: "image/jpeg",
            file_name: "upload_full.jpg".to_string(),
            width: 1,
            height: 1,
            size_hint: crate::types::SizeHint::Auto,
        };

        let err = client.submit(Tier::Free, image).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingCredential(_)));
        assert!(!client.is_busy());
    }
}
