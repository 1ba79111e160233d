//! Removal workflow
//!
//! [`RemovalProcessor`] ties the pieces of one removal together: payment for
//! the premium tier, image preparation, submission, the decorative progress
//! timer, the session state machine and the download. Frontends drive it and
//! render [`RemovalProcessor::view`].

use crate::{
    client::SubmissionClient,
    config::Tier,
    error::{RelayError, Result},
    payment::PaymentInitiator,
    services::{
        ImagePreparer, NoOpProgressReporter, OutputFormatHandler, ProcessingStage,
        ProgressReporter, ProgressTicker,
    },
    session::{ObjectUrl, Session, SessionState, ViewState},
    types::{ResultImage, UploadedFile},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Destination of downloaded results
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Save `image` under `file_name` and return where it ended up
    async fn deliver(&self, file_name: &str, image: &ResultImage) -> Result<PathBuf>;
}

/// Writes downloads into a directory, creating it on first use
#[derive(Debug, Clone)]
pub struct DirectoryDownloadSink {
    dir: PathBuf,
}

impl DirectoryDownloadSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's download directory, or the working directory when there is none
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloadSink {
    async fn deliver(&self, file_name: &str, image: &ResultImage) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RelayError::file_io_error("create download directory", &self.dir, &e))?;

        let path = self.dir.join(file_name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| RelayError::file_io_error("write download", &path, &e))?;
        Ok(path)
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub tier: Tier,
    pub url: ObjectUrl,
    pub download: PathBuf,
    pub elapsed: Duration,
    /// Dimensions of the image that was uploaded
    pub width: u32,
    pub height: u32,
}

/// Mirrors ticker progress into the session view before forwarding it
struct SessionProgress {
    session: Arc<Mutex<Session>>,
    inner: Arc<dyn ProgressReporter>,
}

impl ProgressReporter for SessionProgress {
    fn report_progress(&self, percent: u8) {
        lock(&self.session).set_progress(percent);
        self.inner.report_progress(percent);
    }

    fn report_stage(&self, stage: ProcessingStage) {
        self.inner.report_stage(stage);
    }

    fn report_completion(&self, elapsed: Duration) {
        self.inner.report_completion(elapsed);
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.inner.report_error(stage, error);
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives one user's removals from upload to download
pub struct RemovalProcessor {
    session: Arc<Mutex<Session>>,
    client: SubmissionClient,
    payment: Option<PaymentInitiator>,
    sink: Arc<dyn DownloadSink>,
    reporter: Arc<dyn ProgressReporter>,
}

impl RemovalProcessor {
    /// Processor for the free tier only. Add a checkout with [`Self::with_payment`].
    #[must_use]
    pub fn new(client: SubmissionClient, sink: Arc<dyn DownloadSink>) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            client,
            payment: None,
            sink,
            reporter: Arc::new(NoOpProgressReporter),
        }
    }

    #[must_use]
    pub fn with_payment(mut self, payment: PaymentInitiator) -> Self {
        self.payment = Some(payment);
        self
    }

    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        lock(&self.session).view().clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    /// Object URLs still alive in the session
    #[must_use]
    pub fn live_object_urls(&self) -> usize {
        lock(&self.session).object_urls().live_count()
    }

    /// Stage a file for the next run
    ///
    /// # Errors
    /// - `Busy` while a run or checkout is in progress
    pub fn stage_upload(&self, file: UploadedFile) -> Result<()> {
        lock(&self.session).stage(file)
    }

    /// Load a file from disk and stage it
    ///
    /// # Errors
    /// - File cannot be read
    /// - `Busy` while a run or checkout is in progress
    pub fn stage_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = ImagePreparer::load_upload(path)?;
        self.stage_upload(file)
    }

    /// # Errors
    /// - `Busy` while a run or checkout is in progress
    pub fn dismiss(&self) -> Result<()> {
        lock(&self.session).dismiss()
    }

    /// # Errors
    /// - `Busy` while a run or checkout is in progress
    pub fn reset(&self) -> Result<()> {
        lock(&self.session).reset()
    }

    /// Remove the background of the staged file and download the result
    ///
    /// Premium runs go through checkout and verification first; nothing is
    /// submitted unless the relay confirms the payment. On failure the
    /// session returns to the staged file.
    ///
    /// # Errors
    /// - `InvalidInput` when nothing is staged
    /// - `Busy` while another run or checkout is in progress
    /// - Payment errors for the premium tier
    /// - Preparation, submission and download errors
    #[instrument(skip(self), fields(tier = %tier))]
    pub async fn run(&self, tier: Tier) -> Result<RemovalOutcome> {
        if tier == Tier::Premium {
            self.pay().await?;
        }

        let file = lock(&self.session).begin_processing(tier)?;
        let profile = self.client.config().profile(tier).clone();
        let progress: Arc<dyn ProgressReporter> = Arc::new(SessionProgress {
            session: Arc::clone(&self.session),
            inner: Arc::clone(&self.reporter),
        });

        self.reporter.report_stage(ProcessingStage::Preparing);
        let ticker = ProgressTicker::spawn(
            progress,
            self.client.config().progress_tick,
            self.client.config().progress_ceiling,
        );

        let mut stage = ProcessingStage::Preparing;
        let submitted = async {
            let encoded = ImagePreparer::prepare_async(file, profile.clone()).await?;
            let dimensions = (encoded.width, encoded.height);
            stage = ProcessingStage::Uploading;
            self.reporter.report_stage(stage);
            let result = self.client.submit(tier, encoded).await?;
            Ok::<_, RelayError>((result, dimensions))
        }
        .await;

        let (_, elapsed) = ticker.finish().await;

        let (result, (width, height)) = match submitted {
            Ok(value) => value,
            Err(e) => {
                lock(&self.session).fail(elapsed);
                self.reporter.report_error(stage, &e.user_message());
                warn!("Removal failed after {:.2}s: {}", elapsed.as_secs_f64(), e);
                return Err(e);
            },
        };

        let url = lock(&self.session).complete(result.clone(), elapsed)?;
        self.reporter.report_completion(elapsed);

        self.reporter.report_stage(ProcessingStage::Downloading);
        let file_name = OutputFormatHandler::download_name_for(&profile.download_name, &result.content_type);
        let download = self.sink.deliver(&file_name, &result).await.map_err(|e| {
            self.reporter.report_error(ProcessingStage::Downloading, &e.to_string());
            e
        })?;
        self.reporter.report_stage(ProcessingStage::Completed);
        info!("Saved {} in {:.2}s", download.display(), elapsed.as_secs_f64());

        Ok(RemovalOutcome {
            tier,
            url,
            download,
            elapsed,
            width,
            height,
        })
    }

    /// Deliver the current result again without a new request
    ///
    /// # Errors
    /// - `InvalidInput` when the session holds no result
    /// - Download errors
    pub async fn download_again(&self) -> Result<PathBuf> {
        let (result, tier) = {
            let session = lock(&self.session);
            match (session.result(), session.last_tier()) {
                (Some(result), Some(tier)) => (result.clone(), tier),
                _ => return Err(RelayError::invalid_input("There is no result to download yet.")),
            }
        };

        let profile = self.client.config().profile(tier);
        let file_name = OutputFormatHandler::download_name_for(&profile.download_name, &result.content_type);
        self.sink.deliver(&file_name, &result).await
    }

    async fn pay(&self) -> Result<()> {
        let payment = self
            .payment
            .as_ref()
            .ok_or_else(|| RelayError::invalid_config("Premium tier needs a checkout widget"))?;

        lock(&self.session).begin_checkout()?;
        self.reporter.report_stage(ProcessingStage::Payment);
        let outcome = payment.purchase().await;
        lock(&self.session).finish_checkout();

        match outcome {
            Ok(_) => Ok(()),
            Err(e) => {
                self.reporter.report_error(ProcessingStage::Payment, &e.user_message());
                Err(e)
            },
        }
    }
}

impl std::fmt::Debug for RemovalProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemovalProcessor")
            .field("state", &self.state())
            .field("client", &self.client)
            .field("payment", &self.payment)
            .finish_non_exhaustive()
    }
}
