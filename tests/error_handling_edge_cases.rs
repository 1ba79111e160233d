//! Error handling and edge case testing
//!
//! Boundary conditions of configuration, image preparation, session
//! transitions and user-facing error messages.

use bgremove_relay::{
    config::{ClientConfig, ServerConfig, StoreLocation, Tier, TierProfile},
    error::{RelayError, Result, GENERIC_FAILURE_MESSAGE},
    services::{ImagePreparer, OutputFormatHandler},
    session::{Session, SessionState},
    types::{ResultImage, UploadedFile},
    verify_payment_signature,
};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 128]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_config_validation_edge_cases() -> Result<()> {
    // Boundary values for JPEG quality
    let config = ClientConfig::builder().jpeg_quality(0).build()?;
    assert_eq!(config.free_profile.jpeg_quality, 0);

    let config = ClientConfig::builder().jpeg_quality(100).build()?;
    assert_eq!(config.free_profile.jpeg_quality, 100);

    // The builder clamps out-of-range quality
    let config = ClientConfig::builder().jpeg_quality(150).build()?;
    assert_eq!(config.free_profile.jpeg_quality, 100);

    // Manual edits are caught by validation
    let mut config = ClientConfig::default();
    config.free_profile.jpeg_quality = 101;
    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("JPEG quality"));
    assert!(error.to_string().contains("101"));
    assert!(error.to_string().contains("0-100"));

    let mut config = ClientConfig::default();
    config.premium_profile.max_dimension = 0;
    assert!(config.validate().is_err());

    let mut config = ClientConfig::default();
    config.progress_ceiling = 100;
    assert!(config.validate().is_err());

    // Zero is not a valid tick interval
    let error = ClientConfig::builder()
        .free_api_key("k")
        .progress_tick(Duration::ZERO)
        .build()
        .unwrap_err();
    assert!(error.to_string().contains("progress tick"));
    assert!(ClientConfig::builder()
        .progress_tick(Duration::from_micros(500))
        .build()
        .is_ok());

    assert!(ClientConfig::builder().premium_amount(0).build().is_err());
    assert!(ClientConfig::builder().relay_base_url("  ").build().is_err());
    assert!(ClientConfig::builder().free_api_url("").build().is_err());

    Ok(())
}

#[test]
fn test_relay_endpoint_joining() -> Result<()> {
    for base in ["http://localhost:3002", "http://localhost:3002/"] {
        let config = ClientConfig::builder().relay_base_url(base).build()?;
        assert_eq!(
            config.relay_endpoint("/verify-payment"),
            "http://localhost:3002/verify-payment"
        );
        assert_eq!(
            config.target(Tier::Premium).url,
            "http://localhost:3002/remove-bg"
        );
        // The relay holds the real key
        assert!(config.target(Tier::Premium).api_key.is_none());
    }
    Ok(())
}

#[test]
fn test_tier_parsing() {
    assert_eq!("free".parse::<Tier>().unwrap(), Tier::Free);
    assert_eq!(" Premium ".parse::<Tier>().unwrap(), Tier::Premium);

    let error = "gold".parse::<Tier>().unwrap_err();
    assert!(matches!(error, RelayError::InvalidConfig(_)));
    assert!(error.to_string().contains("gold"));

    assert_eq!(Tier::Free.to_string(), "free");
    assert_eq!(Tier::Premium.to_string(), "premium");
}

#[test]
fn test_store_location_parsing() {
    assert_eq!(
        StoreLocation::parse("file:///var/lib/images"),
        Some(StoreLocation::Directory(PathBuf::from("/var/lib/images")))
    );
    assert_eq!(
        StoreLocation::parse("./images"),
        Some(StoreLocation::Directory(PathBuf::from("./images")))
    );
    assert_eq!(StoreLocation::parse("mongodb+srv://cluster/images"), None);
    assert_eq!(StoreLocation::parse("   "), None);
}

#[test]
fn test_server_config_missing_credentials() {
    let config = ServerConfig::default();
    assert_eq!(
        config.missing_credentials(),
        vec!["RAZORPAY_KEY_ID", "RAZORPAY_KEY_SECRET", "REMOVE_BG_API_KEY"]
    );

    let config = ServerConfig {
        razorpay_key_id: Some(String::new()),
        razorpay_key_secret: Some("secret".to_string()),
        remove_bg_api_key: Some("key".to_string()),
        ..ServerConfig::default()
    };
    assert_eq!(config.missing_credentials(), vec!["RAZORPAY_KEY_ID"]);
    assert!(config.store_location().is_none());
}

#[test]
fn test_prepare_rejects_non_images() {
    let profile = TierProfile::full();

    let empty = UploadedFile::new(Vec::<u8>::new(), "image/png", "empty.png");
    assert!(ImagePreparer::prepare(&empty, &profile).is_err());

    let text = UploadedFile::new(b"hello world".to_vec(), "text/plain", "notes.txt");
    assert!(ImagePreparer::prepare(&text, &profile).is_err());

    // A PNG header alone is not enough
    let truncated = png_bytes(32, 32)[..16].to_vec();
    let truncated = UploadedFile::new(truncated, "image/png", "broken.png");
    let error = ImagePreparer::prepare(&truncated, &profile).unwrap_err();
    assert_eq!(
        error.user_message(),
        "The selected file could not be read as an image."
    );
}

#[test]
fn test_prepare_tiny_and_extreme_aspect_images() -> Result<()> {
    let one_pixel = UploadedFile::new(png_bytes(1, 1), "image/png", "dot.png");
    let encoded = ImagePreparer::prepare(&one_pixel, &TierProfile::preview())?;
    assert_eq!((encoded.width, encoded.height), (1, 1));

    // Very wide images never collapse to a zero-height side
    let strip = UploadedFile::new(png_bytes(4000, 2), "image/png", "strip.png");
    let encoded = ImagePreparer::prepare(&strip, &TierProfile::preview())?;
    assert_eq!((encoded.width, encoded.height), (600, 1));

    let tall = UploadedFile::new(png_bytes(3, 3000), "image/png", "tall.png");
    let encoded = ImagePreparer::prepare(&tall, &TierProfile::full())?;
    assert_eq!((encoded.width, encoded.height), (1, 1024));
    assert_eq!(encoded.mime_type, "image/jpeg");

    Ok(())
}

#[test]
fn test_load_upload_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.png");

    let error = ImagePreparer::load_upload(&missing).unwrap_err();
    assert!(matches!(error, RelayError::Io(_)));
    assert!(error.to_string().contains("does-not-exist.png"));
}

#[test]
fn test_load_upload_guesses_mime_from_content() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let misnamed = temp_dir.path().join("photo.jpg");
    std::fs::write(&misnamed, png_bytes(8, 8)).unwrap();

    let upload = ImagePreparer::load_upload(&misnamed)?;
    assert_eq!(upload.mime_type, "image/png");
    assert_eq!(upload.file_name, "photo.jpg");
    Ok(())
}

#[test]
fn test_session_transition_errors() {
    let mut session = Session::new();

    let error = session.begin_processing(Tier::Free).unwrap_err();
    assert_eq!(error.user_message(), "Please upload an image first.");
    assert_eq!(session.state(), SessionState::Idle);

    // Nothing to complete outside processing
    let result = ResultImage::new(png_bytes(2, 2), "image/png");
    assert!(session.complete(result, Duration::from_secs(1)).is_err());
    assert_eq!(session.object_urls().live_count(), 0);

    session
        .stage(UploadedFile::new(png_bytes(2, 2), "image/png", "a.png"))
        .unwrap();
    session.begin_processing(Tier::Free).unwrap();
    assert!(matches!(session.dismiss(), Err(RelayError::Busy)));
    assert!(matches!(session.begin_checkout(), Err(RelayError::Busy)));
    assert!(matches!(
        session.stage(UploadedFile::new(png_bytes(2, 2), "image/png", "b.png")),
        Err(RelayError::Busy)
    ));
    assert_eq!(session.file().unwrap().file_name, "a.png");
}

#[test]
fn test_progress_is_clamped_and_ignored_outside_processing() {
    let mut session = Session::new();
    session.set_progress(40);
    assert_eq!(session.view().progress_percent, 0);

    session
        .stage(UploadedFile::new(png_bytes(2, 2), "image/png", "a.png"))
        .unwrap();
    session.begin_processing(Tier::Premium).unwrap();
    session.set_progress(250);
    assert_eq!(session.view().progress_percent, 100);
}

#[test]
fn test_user_messages() {
    assert_eq!(
        RelayError::Network("connection refused".to_string()).user_message(),
        GENERIC_FAILURE_MESSAGE
    );
    assert_eq!(
        RelayError::upstream(402, "Insufficient credits").user_message(),
        "Error: Insufficient credits"
    );
    assert_eq!(
        RelayError::SignatureMismatch.user_message(),
        "Payment verification failed on server. Processing aborted."
    );
    assert_eq!(
        RelayError::VerificationUnavailable("timeout".to_string()).user_message(),
        "Payment received but verification failed. Check server logs."
    );
    assert!(RelayError::PaymentFailed("Card declined".to_string())
        .user_message()
        .contains("Card declined"));
}

#[test]
fn test_download_names_follow_content_type() {
    assert_eq!(
        OutputFormatHandler::download_name_for("background-removed.png", "image/png"),
        "background-removed.png"
    );
    assert_eq!(
        OutputFormatHandler::download_name_for("background-removed.png", "image/jpeg; charset=binary"),
        "background-removed.jpg"
    );
    assert_eq!(
        OutputFormatHandler::download_name_for("background-removed-preview.png", "application/octet-stream"),
        "background-removed-preview.png"
    );
}

#[test]
fn test_signature_edge_cases() {
    let secret = "secret";
    let valid = bgremove_relay::sign_payment(secret, "order_1", "pay_1");

    assert!(verify_payment_signature(secret, "order_1", "pay_1", &valid));
    assert!(!verify_payment_signature(secret, "order_1", "pay_1", ""));
    assert!(!verify_payment_signature(secret, "order_1", "pay_1", "not-hex"));
    assert!(!verify_payment_signature("", "order_1", "pay_1", &valid));
    // The separator keeps "order_1|pay_1" distinct from "order_|1pay_1"
    assert!(!verify_payment_signature(secret, "order_", "1pay_1", &valid));
}
