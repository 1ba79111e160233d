//! Error types for background removal and relay operations

use thiserror::Error;

/// Result type alias for background removal and relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Generic message shown to the user when a transport failure occurs
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while removing the background.";

/// Error types for the client flow and the relay server
#[derive(Error, Debug)]
pub enum RelayError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// User-input error, such as submitting without an uploaded file
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A submission is already in flight for this session
    #[error("A submission is already in progress")]
    Busy,

    /// Non-success response from the removal API, the relay, or the payment provider
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Network or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Checkout widget reported a failed payment
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// Checkout widget was closed without completing payment
    #[error("Payment was cancelled")]
    PaymentCancelled,

    /// The relay recomputed the payment signature and it did not match
    #[error("Payment verification failed: signature mismatch")]
    SignatureMismatch,

    /// The verification call itself failed
    #[error("Payment verification unavailable: {0}")]
    VerificationUnavailable(String),

    /// A server-held credential is not configured
    #[error("Missing credential: {0} is not configured")]
    MissingCredential(&'static str),

    /// Write failures in the image record store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Memory allocation or processing errors
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Create a new user-input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an upstream error from a status code and message
    pub fn upstream<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Create network error with operation context
    pub fn network_error<S: AsRef<str>>(context: S, error: reqwest::Error) -> Self {
        Self::Network(format!("{}: {}", context.as_ref(), error))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Message suitable for showing to the end user.
    ///
    /// Upstream errors surface the provider's own message; transport failures
    /// collapse to a generic notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::Busy => "Please wait for the current image to finish processing.".to_string(),
            Self::Upstream { message, .. } => format!("Error: {}", message),
            Self::Network(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            Self::PaymentFailed(reason) => format!("Oops! Something went wrong.\n{}", reason),
            Self::PaymentCancelled => "Payment was cancelled.".to_string(),
            Self::SignatureMismatch => {
                "Payment verification failed on server. Processing aborted.".to_string()
            },
            Self::VerificationUnavailable(_) => {
                "Payment received but verification failed. Check server logs.".to_string()
            },
            Self::Io(_) | Self::Image(_) | Self::Processing(_) => {
                "The selected file could not be read as an image.".to_string()
            },
            Self::MissingCredential(_)
            | Self::Storage(_)
            | Self::InvalidConfig(_)
            | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

#[cfg(feature = "server")]
mod http {
    use super::RelayError;
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };

    impl RelayError {
        /// HTTP status used when this error terminates a relay request
        #[must_use]
        pub fn status_code(&self) -> StatusCode {
            match self {
                RelayError::InvalidInput(_) | RelayError::Image(_) => StatusCode::BAD_REQUEST,
                RelayError::Busy => StatusCode::CONFLICT,
                RelayError::Upstream { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                },
                RelayError::SignatureMismatch => StatusCode::BAD_REQUEST,
                RelayError::PaymentFailed(_) | RelayError::PaymentCancelled => {
                    StatusCode::PAYMENT_REQUIRED
                },
                RelayError::Network(_)
                | RelayError::VerificationUnavailable(_)
                | RelayError::MissingCredential(_)
                | RelayError::Storage(_)
                | RelayError::InvalidConfig(_)
                | RelayError::Processing(_)
                | RelayError::Io(_)
                | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for RelayError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                tracing::error!("Relay request failed: {}", self);
            } else {
                tracing::info!("Relay request rejected: {}", self);
            }

            let message = match &self {
                RelayError::InvalidInput(msg) => msg.clone(),
                RelayError::Upstream { message, .. } => message.clone(),
                other => other.to_string(),
            };

            (status, Json(serde_json::json!({ "error": message }))).into_response()
        }
    }
}
