#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Background Removal Client and Relay
//!
//! Removes image backgrounds through a third-party removal API, with two tiers:
//!
//! - **Free**: the image is downscaled to 1024px, encoded as JPEG and sent
//!   straight to the public removal API with a client-held key.
//! - **Premium**: the user pays through a hosted checkout first; the relay
//!   verifies the payment signature, then the image is downscaled to 600px,
//!   encoded as PNG and sent through the relay, which holds the real key.
//!
//! The crate contains both halves: the client flow (image preparation,
//! submission, session state, checkout) and the relay server (removal proxy,
//! order creation, signature verification, upload record store).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_relay::{remove_background_from_bytes, ClientConfig, Tier};
//!
//! # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
//! let config = ClientConfig::builder()
//!     .free_api_key(std::env::var("BGREMOVE_API_KEY")?)
//!     .build()?;
//! let result = remove_background_from_bytes(upload, Tier::Free, &config).await?;
//! std::fs::write("background-removed.png", &result.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! For the full interactive flow (staging, decorative progress, payment,
//! download), drive a [`RemovalProcessor`].
//!
//! ### Feature Flags
//!
//! - `cli` (default): the `bgremove` command, progress bar and log subscriber
//! - `server` (default): the relay router and the `bgremove-relay` command
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bgremove-relay = { version = "0.1", default-features = false }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod payment;
pub mod processor;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
pub mod session;
pub mod signature;
pub mod tracing_config;
pub mod types;

use tokio::io::AsyncRead;

// Public API exports
pub use client::SubmissionClient;
pub use config::{ClientConfig, ServerConfig, Tier, TierProfile};
pub use error::{RelayError, Result};
pub use payment::{CheckoutOutcome, CheckoutRequest, CheckoutWidget, PaymentInitiator, RelayClient};
pub use processor::{DirectoryDownloadSink, DownloadSink, RemovalOutcome, RemovalProcessor};
pub use services::{
    ConsoleProgressReporter, ImagePreparer, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTicker,
};
pub use session::{ObjectUrl, ObjectUrlStore, Session, SessionState, ViewState};
pub use signature::{sign_payment, verify_payment_signature};
pub use types::{EncodedImage, ResultImage, UploadedFile};

#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
pub use tracing_config::{spans, TracingConfig, TracingFormat};

/// Remove the background of an image held in memory
///
/// Prepares the image with the tier's profile and submits it once. No
/// session, progress or payment is involved; premium submissions still need
/// a relay that accepts them.
///
/// # Errors
/// - The bytes cannot be decoded as an image
/// - Any error of [`SubmissionClient::submit`]
pub async fn remove_background_from_bytes(
    image_bytes: impl Into<bytes::Bytes>,
    tier: Tier,
    config: &ClientConfig,
) -> Result<ResultImage> {
    let upload = UploadedFile::new(image_bytes, "", "upload");
    let encoded = ImagePreparer::prepare_async(upload, config.profile(tier).clone()).await?;

    SubmissionClient::new(config.clone())?.submit(tier, encoded).await
}

/// Remove the background of an image read from an async stream
///
/// # Errors
/// - Reading the stream fails
/// - Any error of [`remove_background_from_bytes`]
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    tier: Tier,
    config: &ClientConfig,
) -> Result<ResultImage> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer)
        .await
        .map_err(|e| RelayError::processing(format!("Failed to read from stream: {}", e)))?;

    remove_background_from_bytes(buffer, tier, config).await
}
