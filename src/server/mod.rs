//! Relay server
//!
//! Holds the provider secrets so the browser-side client never sees them:
//! the removal API key, the payment key id and the payment key secret.
//!
//! | Route             | Purpose                                         |
//! |-------------------|-------------------------------------------------|
//! | `/remove-bg`      | Forward an image to the removal provider        |
//! | `/create-order`   | Create a payment order                          |
//! | `/verify-payment` | Check a checkout signature                      |
//! | `/save-image`     | Store a raw upload as a write-once record       |
//!
//! Anything else falls through to the static front-end directory when one
//! is configured.

pub mod handlers;
pub mod razorpay;
pub mod store;

use crate::{
    config::ServerConfig,
    error::{RelayError, Result},
};
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

pub use razorpay::{OrderProvider, RazorpayProvider};
pub use store::{FsImageStore, ImageStore};

/// Shared state of every relay handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Client for calls to the removal provider
    pub http: reqwest::Client,
    /// `None` until both payment credentials are configured
    pub orders: Option<Arc<dyn OrderProvider>>,
    /// `None` unless a supported store location is configured
    pub store: Option<Arc<dyn ImageStore>>,
}

impl AppState {
    /// Build the state for a configuration, logging every missing credential
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        config.warn_missing_credentials();

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RelayError::network_error("Failed to create HTTP client", e))?;

        let orders = match (&config.razorpay_key_id, &config.razorpay_key_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(Arc::new(RazorpayProvider::new(
                    http.clone(),
                    config.razorpay_api_base.clone(),
                    id.clone(),
                    secret.clone(),
                )) as Arc<dyn OrderProvider>)
            },
            _ => None,
        };

        let store = config.store_location().map(|location| {
            info!("Saving uploaded images to {:?}", location);
            store::open_store(&location)
        });

        Ok(Self {
            config: Arc::new(config),
            http,
            orders,
            store,
        })
    }

    #[must_use]
    pub fn with_order_provider(mut self, orders: Arc<dyn OrderProvider>) -> Self {
        self.orders = Some(orders);
        self
    }

    #[must_use]
    pub fn with_image_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.store = Some(store);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("port", &self.config.port)
            .field("orders", &self.orders.is_some())
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

/// Build the relay router with CORS, tracing, upload limit and static files
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let upload_limit = state.config.max_upload_bytes;

    let mut router = Router::new()
        .route("/remove-bg", post(handlers::remove_bg))
        .route("/create-order", post(handlers::create_order))
        .route("/verify-payment", post(handlers::verify_payment))
        .route("/save-image", post(handlers::save_image))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state);

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
}

/// Bind to the configured port on all interfaces and serve until `shutdown` resolves
///
/// # Errors
/// - HTTP client or listener setup fails
/// - The server stops with an I/O error
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::from_config(config)?);

    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on port {}", addr.port());

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Relay stopped");
    Ok(())
}
