//! Terminal progress bar for removal runs

use crate::services::{time_taken_label, ProcessingStage, ProgressReporter};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Renders the decorative progress as an indicatif bar
///
/// The bar stays hidden through checkout so it does not draw over the prompts.
pub(crate) struct IndicatifProgressReporter {
    bar: ProgressBar,
}

impl IndicatifProgressReporter {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn report_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn report_stage(&self, stage: ProcessingStage) {
        if stage == ProcessingStage::Preparing {
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
            self.bar.enable_steady_tick(Duration::from_millis(120));
        }
        self.bar.set_message(stage.description());
    }

    fn report_completion(&self, elapsed: Duration) {
        self.bar.set_position(100);
        self.bar.finish_with_message(time_taken_label(elapsed));
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar
            .abandon_with_message(format!("{} failed: {}", stage.description(), error));
    }
}
