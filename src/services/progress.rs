//! Progress reporting service
//!
//! The progress shown during a submission is decorative: a timer nudges the
//! bar toward a ceiling while the real request runs, and completion snaps it
//! to 100. This module owns that timer and the reporter trait frontends
//! implement to display it.

use instant::Instant;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Steps of one removal run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Waiting on checkout and payment verification
    Payment,
    /// Decoding, resizing and re-encoding the upload
    Preparing,
    /// Request in flight to the removal API or relay
    Uploading,
    /// Delivering the result to the download location
    Downloading,
    /// Processing completed
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Payment => "Waiting for payment",
            ProcessingStage::Preparing => "Preparing image",
            ProcessingStage::Uploading => "Removing background",
            ProcessingStage::Downloading => "Saving result",
            ProcessingStage::Completed => "Processing completed",
        }
    }
}

/// Trait for displaying progress of a removal run
pub trait ProgressReporter: Send + Sync {
    /// Report the decorative progress percentage (0-100)
    fn report_progress(&self, percent: u8);

    /// Report that the run entered a new stage
    fn report_stage(&self, stage: ProcessingStage) {
        let _ = stage;
    }

    /// Report completion with the wall-clock time of the submission
    fn report_completion(&self, elapsed: Duration);

    /// Report an error during processing
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _percent: u8) {}

    fn report_completion(&self, _elapsed: Duration) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Console progress reporter that logs progress through the `log` facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// # Arguments
    /// * `verbose` - Whether to log every percentage tick
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, percent: u8) {
        if self.verbose || percent == 100 {
            log::info!("[{}%] {}", percent, ProcessingStage::Uploading.description());
        }
    }

    fn report_stage(&self, stage: ProcessingStage) {
        log::info!("{}", stage.description());
    }

    fn report_completion(&self, elapsed: Duration) {
        log::info!("✅ {}", time_taken_label(elapsed));
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }
}

/// "Time taken: 1.23s"
#[must_use]
pub fn time_taken_label(elapsed: Duration) -> String {
    format!("Time taken: {:.2}s", elapsed.as_secs_f64())
}

/// Shortest interval between decorative ticks
const MIN_TICK: Duration = Duration::from_millis(1);

/// Decorative progress timer running beside the real request
///
/// The timer is a separate task. [`ProgressTicker::finish`] cancels it and
/// waits for it to exit before reporting 100%, so no tick can land after
/// completion.
pub struct ProgressTicker {
    cancel: CancellationToken,
    handle: JoinHandle<u8>,
    reporter: Arc<dyn ProgressReporter>,
    started: Instant,
}

impl ProgressTicker {
    /// Start ticking from 0, adding one percent every `tick` up to `ceiling`
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(reporter: Arc<dyn ProgressReporter>, tick: Duration, ceiling: u8) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task_reporter = Arc::clone(&reporter);
        let ceiling = ceiling.min(99);
        // tokio intervals panic on a zero period
        let tick = tick.max(MIN_TICK);

        task_reporter.report_progress(0);

        let handle = tokio::spawn(async move {
            let mut percent: u8 = 0;
            let mut interval = tokio::time::interval(tick);
            // First tick of a tokio interval completes immediately
            interval.tick().await;

            while percent < ceiling {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        percent += 1;
                        task_reporter.report_progress(percent);
                    }
                }
            }
            percent
        });

        Self {
            cancel,
            handle,
            reporter,
            started: Instant::now(),
        }
    }

    /// Time since the ticker was started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop the timer, wait for it to exit, then snap the bar to 100%
    ///
    /// Returns the last decorative value reached and the elapsed time.
    pub async fn finish(self) -> (u8, Duration) {
        let elapsed = self.started.elapsed();
        self.cancel.cancel();
        let reached = self.handle.await.unwrap_or_else(|e| {
            tracing::warn!("Progress ticker task ended abnormally: {}", e);
            0
        });
        self.reporter.report_progress(100);
        (reached, elapsed)
    }
}
