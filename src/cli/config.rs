//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{ClientConfig, Tier};
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a `ClientConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `ClientConfig` from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<ClientConfig> {
        let mut builder = ClientConfig::builder()
            .relay_base_url(cli.relay_url.trim())
            .jpeg_quality(cli.jpeg_quality)
            .checkout_key_id(cli.checkout_key.trim())
            .request_timeout(Duration::from_secs(cli.timeout));

        if let Some(url) = &cli.api_url {
            builder = builder.free_api_url(url.trim());
        }
        if let Some(key) = cli.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            builder = builder.free_api_key(key);
        }

        builder.build().context("Invalid configuration")
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.jpeg_quality > 100 {
            anyhow::bail!("JPEG quality must be between 0 and 100, got {}", cli.jpeg_quality);
        }
        if cli.timeout == 0 {
            anyhow::bail!("Timeout must be at least one second");
        }
        if cli.tier == Tier::Free && cli.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            anyhow::bail!("The free tier needs an API key: pass --api-key or set BGREMOVE_API_KEY");
        }
        Ok(())
    }
}
