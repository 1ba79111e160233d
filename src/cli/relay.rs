//! Relay server command
//!
//! Every setting can come from the environment (or a `.env` file), which is
//! how the relay is normally deployed.

use crate::{
    config::{ServerConfig, DEFAULT_RAZORPAY_API_BASE, DEFAULT_UPSTREAM_URL},
    server,
    tracing_config::{spans, TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::Instrument;

/// Relay between the background removal client and the removal and payment providers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-relay")]
pub struct RelayCli {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3002)]
    pub port: u16,

    /// Payment provider key id
    #[arg(long, env = "RAZORPAY_KEY_ID")]
    pub razorpay_key_id: Option<String>,

    /// Payment provider key secret, also used to verify checkout signatures
    #[arg(long, env = "RAZORPAY_KEY_SECRET", hide_env_values = true)]
    pub razorpay_key_secret: Option<String>,

    /// Payment provider API base URL
    #[arg(long, env = "RAZORPAY_API_BASE", default_value = DEFAULT_RAZORPAY_API_BASE)]
    pub razorpay_api_base: String,

    /// Removal provider API key [fallback env: REACT_APP_REMOVE_BG_API_KEY]
    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    pub remove_bg_api_key: Option<String>,

    /// Removal provider endpoint
    #[arg(long, env = "REMOVE_BG_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub remove_bg_url: String,

    /// Where uploads sent to /save-image are stored (file:// URL or directory)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory of the web front-end to serve
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl RelayCli {
    /// Resolve the server configuration, applying the legacy key variable
    pub fn to_server_config(&self) -> ServerConfig {
        let remove_bg_api_key = self
            .remove_bg_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("REACT_APP_REMOVE_BG_API_KEY").ok())
            .filter(|k| !k.is_empty());

        ServerConfig {
            port: self.port,
            razorpay_key_id: self.razorpay_key_id.clone(),
            razorpay_key_secret: self.razorpay_key_secret.clone(),
            razorpay_api_base: self.razorpay_api_base.clone(),
            remove_bg_api_key,
            upstream_url: self.remove_bg_url.clone(),
            database_url: self.database_url.clone().filter(|u| !u.trim().is_empty()),
            static_dir: self.static_dir.clone(),
            max_upload_bytes: self.max_upload_bytes,
            ..ServerConfig::default()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received. Shutting down...");
}

pub async fn main() -> Result<()> {
    // A missing .env file is normal
    let _ = dotenv::dotenv();
    let cli = RelayCli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(TracingFormat::Compact)
        .with_env_filter_from_env()
        .init()
        .context("Failed to initialize tracing")?;

    let config = cli.to_server_config();
    let span = spans::relay(config.port);
    server::serve(config, shutdown_signal())
        .instrument(span)
        .await
        .context("Relay server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = RelayCli::parse_from(["bgremove-relay", "--remove-bg-api-key", "key"]);
        let config = cli.to_server_config();

        assert_eq!(config.remove_bg_api_key.as_deref(), Some("key"));
        assert_eq!(config.upstream_file_field, "image_file");
        assert_eq!(config.upstream_key_header, "X-Api-Key");
        assert_eq!(config.currency, "INR");
    }

    #[test]
    fn test_flags_override() {
        let cli = RelayCli::parse_from([
            "bgremove-relay",
            "--port",
            "8080",
            "--database-url",
            "file:///tmp/images",
            "--static-dir",
            "./public",
            "--max-upload-bytes",
            "1024",
        ]);
        let config = cli.to_server_config();

        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.static_dir, Some(PathBuf::from("./public")));
        assert!(config.store_location().is_some());
    }
}
