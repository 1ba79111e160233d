//! Configuration types for the submission flow and the relay server

use crate::error::{RelayError, Result};
use crate::types::SizeHint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Public removal endpoint used by the free tier
pub const DEFAULT_FREE_API_URL: &str =
    "https://background-remover-service-619657643398.us-central1.run.app/remove-background/";

/// Relay base URL used by the premium tier
pub const DEFAULT_RELAY_URL: &str = "http://localhost:3002";

/// Provider the relay forwards images to
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.remove.bg/v1.0/removebg";

/// Payment provider REST base
pub const DEFAULT_RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

/// Premium price in paise (Rs. 50)
pub const DEFAULT_PREMIUM_AMOUNT: u64 = 5000;

/// Processing tier selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Tier {
    /// Direct call to the public removal API with a client-held key
    Free,
    /// Payment-gated call through the relay server
    Premium,
}

impl Tier {
    /// Encoding mode applied to uploads in this tier
    #[must_use]
    pub fn encoding_mode(self) -> EncodingMode {
        match self {
            Self::Free => EncodingMode::Full,
            Self::Premium => EncodingMode::Preview,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Premium => write!(f, "premium"),
        }
    }
}

impl FromStr for Tier {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            other => Err(RelayError::invalid_config(format!(
                "Unknown tier '{}'. Expected 'free' or 'premium'",
                other
            ))),
        }
    }
}

/// Encoding parameters family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Larger JPEG upload, flattened result
    Full,
    /// Smaller PNG upload that keeps transparency
    Preview,
}

/// Output image format options for the prepared upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG (no transparency)
    Jpeg,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

/// Everything that differs between the two encoding modes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProfile {
    pub mode: EncodingMode,
    /// Longest side of the uploaded image, in pixels
    pub max_dimension: u32,
    pub output_format: OutputFormat,
    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,
    pub size_hint: SizeHint,
    /// File name of the multipart part
    pub upload_name: String,
    /// File name of the delivered download
    pub download_name: String,
}

impl TierProfile {
    /// 1024px JPEG upload used by the free tier
    #[must_use]
    pub fn full() -> Self {
        Self {
            mode: EncodingMode::Full,
            max_dimension: 1024,
            output_format: OutputFormat::Jpeg,
            jpeg_quality: 95,
            size_hint: SizeHint::Auto,
            upload_name: "upload_full.jpg".to_string(),
            download_name: "background-removed.png".to_string(),
        }
    }

    /// 600px PNG upload used by the premium tier
    #[must_use]
    pub fn preview() -> Self {
        Self {
            mode: EncodingMode::Preview,
            max_dimension: 600,
            output_format: OutputFormat::Png,
            jpeg_quality: 95,
            size_hint: SizeHint::Preview,
            upload_name: "upload_preview.png".to_string(),
            download_name: "background-removed-preview.png".to_string(),
        }
    }

    /// Validate dimension and quality ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(RelayError::config_value_error(
                "maximum dimension",
                self.max_dimension,
                "1 or greater",
                None,
            ));
        }
        if self.jpeg_quality > 100 {
            return Err(RelayError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(95),
            ));
        }
        Ok(())
    }
}

/// Where a tier sends its multipart request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalTarget {
    pub url: String,
    /// Header used to attach `api_key`
    pub api_key_header: String,
    /// Key attached to every request; `None` for the relay
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl RemovalTarget {
    /// Public removal API, authenticated with a client-held key
    pub fn direct<U: Into<String>>(url: U, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key_header: "X-API-Key".to_string(),
            api_key,
        }
    }

    /// Relay endpoint at `base_url`, which holds the real key server-side
    #[must_use]
    pub fn relay(base_url: &str) -> Self {
        Self {
            url: format!("{}/remove-bg", base_url.trim_end_matches('/')),
            api_key_header: "X-API-Key".to_string(),
            api_key: None,
        }
    }
}

/// Configuration for the client-side submission flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Target of free-tier submissions
    pub free_target: RemovalTarget,

    /// Relay base URL for premium submissions and payment calls
    pub relay_base_url: String,

    pub free_profile: TierProfile,
    pub premium_profile: TierProfile,

    /// Interval between decorative progress increments
    pub progress_tick: Duration,

    /// Highest value the decorative progress reaches before completion
    pub progress_ceiling: u8,

    /// Premium price in the currency's smallest unit
    pub premium_amount: u64,
    pub currency: String,

    /// Public checkout key id passed to the checkout widget
    pub checkout_key_id: String,
    pub merchant_name: String,
    pub checkout_description: String,

    /// Timeout applied to every outbound request
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            free_target: RemovalTarget::direct(DEFAULT_FREE_API_URL, None),
            relay_base_url: DEFAULT_RELAY_URL.to_string(),
            free_profile: TierProfile::full(),
            premium_profile: TierProfile::preview(),
            progress_tick: Duration::from_millis(50),
            progress_ceiling: 99,
            premium_amount: DEFAULT_PREMIUM_AMOUNT,
            currency: "INR".to_string(),
            checkout_key_id: String::new(),
            merchant_name: "transparent.pics".to_string(),
            checkout_description: "Premium Background Removal".to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgremove_relay::config::ClientConfig;
    ///
    /// let config = ClientConfig::builder()
    ///     .relay_base_url("http://localhost:3002")
    ///     .free_api_key("secret")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.free_profile.max_dimension, 1024);
    /// ```
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Encoding profile for a tier
    #[must_use]
    pub fn profile(&self, tier: Tier) -> &TierProfile {
        match tier {
            Tier::Free => &self.free_profile,
            Tier::Premium => &self.premium_profile,
        }
    }

    /// Transport target for a tier
    #[must_use]
    pub fn target(&self, tier: Tier) -> RemovalTarget {
        match tier {
            Tier::Free => self.free_target.clone(),
            Tier::Premium => RemovalTarget::relay(&self.relay_base_url),
        }
    }

    /// Full URL of a relay endpoint such as `/create-order`
    #[must_use]
    pub fn relay_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.relay_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Empty free API URL or relay URL
    /// - Invalid tier profile (zero dimension, JPEG quality above 100)
    /// - Zero progress tick
    /// - Progress ceiling of 100 or more
    /// - Zero premium amount
    pub fn validate(&self) -> Result<()> {
        if self.free_target.url.trim().is_empty() {
            return Err(RelayError::invalid_config("Free API URL must not be empty"));
        }
        if self.relay_base_url.trim().is_empty() {
            return Err(RelayError::invalid_config("Relay URL must not be empty"));
        }
        self.free_profile.validate()?;
        self.premium_profile.validate()?;
        if self.progress_tick.is_zero() {
            return Err(RelayError::config_value_error(
                "progress tick (ms)",
                self.progress_tick.as_millis(),
                "greater than 0",
                Some(50),
            ));
        }
        if self.progress_ceiling >= 100 {
            return Err(RelayError::config_value_error(
                "progress ceiling",
                self.progress_ceiling,
                "0-99",
                Some(99),
            ));
        }
        if self.premium_amount == 0 {
            return Err(RelayError::config_value_error(
                "premium amount",
                self.premium_amount,
                "1 or greater",
                Some(DEFAULT_PREMIUM_AMOUNT),
            ));
        }
        Ok(())
    }
}

/// Builder for `ClientConfig`
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    #[must_use]
    pub fn free_api_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.free_target.url = url.into();
        self
    }

    /// Key attached to free-tier requests. It ships with the client, so treat it as public.
    #[must_use]
    pub fn free_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.free_target.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn relay_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.relay_base_url = url.into();
        self
    }

    #[must_use]
    pub fn free_profile(mut self, profile: TierProfile) -> Self {
        self.config.free_profile = profile;
        self
    }

    #[must_use]
    pub fn premium_profile(mut self, profile: TierProfile) -> Self {
        self.config.premium_profile = profile;
        self
    }

    /// Set JPEG quality of the full profile
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.free_profile.jpeg_quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn progress_tick(mut self, tick: Duration) -> Self {
        self.config.progress_tick = tick;
        self
    }

    #[must_use]
    pub fn premium_amount(mut self, amount: u64) -> Self {
        self.config.premium_amount = amount;
        self
    }

    #[must_use]
    pub fn currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.config.currency = currency.into();
        self
    }

    #[must_use]
    pub fn checkout_key_id<S: Into<String>>(mut self, key_id: S) -> Self {
        self.config.checkout_key_id = key_id.into();
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the final configuration with validation
    ///
    /// # Errors
    /// Any error reported by [`ClientConfig::validate`]
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Image record store selected from the database connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// One JSON document per record inside this directory
    Directory(PathBuf),
}

impl StoreLocation {
    /// Interpret a connection string. Only `file://` URLs and plain paths are supported.
    #[must_use]
    pub fn parse(connection: &str) -> Option<Self> {
        let connection = connection.trim();
        if connection.is_empty() {
            return None;
        }
        if let Some(path) = connection.strip_prefix("file://") {
            return Some(Self::Directory(PathBuf::from(path)));
        }
        if connection.contains("://") {
            return None;
        }
        Some(Self::Directory(PathBuf::from(connection)))
    }
}

/// Relay server configuration. Every credential is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<String>,
    pub razorpay_api_base: String,
    pub currency: String,
    pub remove_bg_api_key: Option<String>,
    pub upstream_url: String,
    /// Multipart field name the provider expects for the image
    pub upstream_file_field: String,
    pub upstream_key_header: String,
    pub database_url: Option<String>,
    /// Directory of the web front-end served at `/`
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3002,
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_api_base: DEFAULT_RAZORPAY_API_BASE.to_string(),
            currency: "INR".to_string(),
            remove_bg_api_key: None,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_file_field: "image_file".to_string(),
            upstream_key_header: "X-Api-Key".to_string(),
            database_url: None,
            static_dir: None,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Names of the credentials that are not set
    #[must_use]
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.razorpay_key_id.as_deref().map_or(true, str::is_empty) {
            missing.push("RAZORPAY_KEY_ID");
        }
        if self.razorpay_key_secret.as_deref().map_or(true, str::is_empty) {
            missing.push("RAZORPAY_KEY_SECRET");
        }
        if self.remove_bg_api_key.as_deref().map_or(true, str::is_empty) {
            missing.push("REMOVE_BG_API_KEY");
        }
        missing
    }

    /// Log one warning per missing credential. Endpoints fail at call time instead.
    pub fn warn_missing_credentials(&self) {
        for name in self.missing_credentials() {
            tracing::warn!(
                credential = name,
                "{} is not set; endpoints that need it will fail until it is configured",
                name
            );
        }
        if let Some(url) = &self.database_url {
            if StoreLocation::parse(url).is_none() {
                tracing::warn!(
                    "DATABASE_URL scheme is not supported; /save-image is disabled (use a file:// URL or a directory path)"
                );
            }
        }
    }

    /// Resolved store location, if any
    #[must_use]
    pub fn store_location(&self) -> Option<StoreLocation> {
        self.database_url.as_deref().and_then(StoreLocation::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_profiles() {
        let config = ClientConfig::default();
        let free = config.profile(Tier::Free);
        assert_eq!(free.max_dimension, 1024);
        assert_eq!(free.output_format, OutputFormat::Jpeg);
        assert_eq!(free.size_hint, SizeHint::Auto);
        assert_eq!(free.download_name, "background-removed.png");

        let premium = config.profile(Tier::Premium);
        assert_eq!(premium.max_dimension, 600);
        assert_eq!(premium.output_format, OutputFormat::Png);
        assert_eq!(premium.size_hint, SizeHint::Preview);
        assert_eq!(premium.download_name, "background-removed-preview.png");
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("free".parse::<Tier>().unwrap(), Tier::Free);
        assert_eq!(" Premium ".parse::<Tier>().unwrap(), Tier::Premium);
        assert!("gold".parse::<Tier>().is_err());
        assert_eq!(Tier::Premium.encoding_mode(), EncodingMode::Preview);
    }

    #[test]
    fn test_targets_per_tier() {
        let config = ClientConfig::builder()
            .relay_base_url("http://relay.local/")
            .free_api_key("k")
            .build()
            .unwrap();

        let free = config.target(Tier::Free);
        assert_eq!(free.url, DEFAULT_FREE_API_URL);
        assert_eq!(free.api_key.as_deref(), Some("k"));

        let premium = config.target(Tier::Premium);
        assert_eq!(premium.url, "http://relay.local/remove-bg");
        assert!(premium.api_key.is_none());

        assert_eq!(
            config.relay_endpoint("/create-order"),
            "http://relay.local/create-order"
        );
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::default().validate().is_ok());

        let config = ClientConfig::builder().jpeg_quality(150).build().unwrap();
        assert_eq!(config.free_profile.jpeg_quality, 100);

        let mut config = ClientConfig::default();
        config.premium_profile.max_dimension = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("maximum dimension"));

        assert!(ClientConfig::builder().premium_amount(0).build().is_err());
        assert!(ClientConfig::builder().relay_base_url("  ").build().is_err());
    }

    #[test]
    fn test_missing_credentials() {
        let config = ServerConfig::default();
        assert_eq!(
            config.missing_credentials(),
            vec!["RAZORPAY_KEY_ID", "RAZORPAY_KEY_SECRET", "REMOVE_BG_API_KEY"]
        );

        let config = ServerConfig {
            razorpay_key_id: Some("rzp_test".to_string()),
            razorpay_key_secret: Some(String::new()),
            remove_bg_api_key: Some("key".to_string()),
            ..ServerConfig::default()
        };
        assert_eq!(config.missing_credentials(), vec!["RAZORPAY_KEY_SECRET"]);
    }

    #[test]
    fn test_store_location_parsing() {
        assert_eq!(
            StoreLocation::parse("file:///var/lib/images"),
            Some(StoreLocation::Directory(PathBuf::from("/var/lib/images")))
        );
        assert_eq!(
            StoreLocation::parse("./records"),
            Some(StoreLocation::Directory(PathBuf::from("./records")))
        );
        assert_eq!(StoreLocation::parse("mongodb://localhost:27017/db"), None);
        assert_eq!(StoreLocation::parse(""), None);
    }
}
