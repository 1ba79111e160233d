//! Session state machine for the removal UI
//!
//! A [`Session`] owns everything one user interaction needs: the staged
//! upload, the current result and its object URL, the visibility flags the
//! frontend renders, and the tier of the last run.
//!
//! ```text
//! idle --stage--> staged --begin_processing--> processing --complete--> result
//!  ^                |  ^                            |                     |
//!  +----dismiss-----+  +-----------fail-------------+                     |
//!  +------------------------------reset---------------------------------+
//! ```
//!
//! Nothing leaves `processing` or an open checkout except the run itself.

use crate::{
    config::Tier,
    error::{RelayError, Result},
    services::time_taken_label,
    types::{ResultImage, UploadedFile},
};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Lifecycle of one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Upload prompt visible, nothing staged
    #[default]
    Idle,
    /// File chosen and previewed, awaiting submission
    Staged,
    /// Request in flight, decorative progress running
    Processing,
    /// Processed image shown and downloaded
    Result,
}

/// What the frontend shows for the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub upload_prompt_visible: bool,
    pub staged_preview_visible: bool,
    pub dismiss_visible: bool,
    pub progress_visible: bool,
    pub result_visible: bool,
    pub reset_visible: bool,
    /// Tier buttons accept clicks
    pub actions_enabled: bool,
    pub progress_percent: u8,
    /// "Time taken: 1.23s" once a run has started
    pub time_taken: Option<String>,
}

impl ViewState {
    /// Visibility of a freshly loaded page
    #[must_use]
    pub fn initial() -> Self {
        Self {
            upload_prompt_visible: true,
            staged_preview_visible: false,
            dismiss_visible: false,
            progress_visible: false,
            result_visible: false,
            reset_visible: false,
            actions_enabled: true,
            progress_percent: 0,
            time_taken: None,
        }
    }

    fn staged() -> Self {
        Self {
            upload_prompt_visible: false,
            staged_preview_visible: true,
            dismiss_visible: true,
            ..Self::initial()
        }
    }

    fn processing() -> Self {
        Self {
            upload_prompt_visible: false,
            progress_visible: true,
            actions_enabled: false,
            time_taken: Some(time_taken_label(Duration::ZERO)),
            ..Self::initial()
        }
    }

    fn result(elapsed: Duration) -> Self {
        Self {
            upload_prompt_visible: false,
            result_visible: true,
            dismiss_visible: true,
            reset_visible: true,
            progress_percent: 100,
            time_taken: Some(time_taken_label(elapsed)),
            ..Self::initial()
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Handle to a result image held in memory, rendered as `blob:<uuid>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live object URLs
///
/// Every URL created here stays alive until revoked. A URL left live after
/// its result is replaced or reset is a leak, visible through [`Self::live_count`].
#[derive(Debug, Default)]
pub struct ObjectUrlStore {
    entries: HashMap<ObjectUrl, ResultImage>,
}

impl ObjectUrlStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a result and return a fresh URL for it
    pub fn create(&mut self, image: ResultImage) -> ObjectUrl {
        let url = ObjectUrl(format!("blob:{}", Uuid::new_v4()));
        self.entries.insert(url.clone(), image);
        url
    }

    #[must_use]
    pub fn resolve(&self, url: &ObjectUrl) -> Option<&ResultImage> {
        self.entries.get(url)
    }

    /// Release a URL. Returns whether it was live.
    pub fn revoke(&mut self, url: &ObjectUrl) -> bool {
        self.entries.remove(url).is_some()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.len()
    }
}

/// One user's upload, run and result
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    file: Option<UploadedFile>,
    result_url: Option<ObjectUrl>,
    urls: ObjectUrlStore,
    view: ViewState,
    last_tier: Option<Tier>,
    checkout_open: bool,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    #[must_use]
    pub fn result_url(&self) -> Option<&ObjectUrl> {
        self.result_url.as_ref()
    }

    /// The current result image, if the session holds one
    #[must_use]
    pub fn result(&self) -> Option<&ResultImage> {
        self.result_url.as_ref().and_then(|url| self.urls.resolve(url))
    }

    #[must_use]
    pub fn last_tier(&self) -> Option<Tier> {
        self.last_tier
    }

    #[must_use]
    pub fn object_urls(&self) -> &ObjectUrlStore {
        &self.urls
    }

    /// Whether a run or a checkout currently owns the session
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state == SessionState::Processing || self.checkout_open
    }

    /// Stage a newly selected file, replacing any earlier file or result
    ///
    /// # Errors
    /// - `Busy` while a run or checkout is in progress
    pub fn stage(&mut self, file: UploadedFile) -> Result<()> {
        if self.is_busy() {
            return Err(RelayError::Busy);
        }
        self.release_result();
        debug!("Staged {} ({} bytes)", file.file_name, file.bytes.len());
        self.file = Some(file);
        self.state = SessionState::Staged;
        self.view = ViewState::staged();
        Ok(())
    }

    /// Drop the staged file or shown result and return to idle
    ///
    /// # Errors
    /// - `Busy` while a run or checkout is in progress
    pub fn dismiss(&mut self) -> Result<()> {
        if self.is_busy() {
            return Err(RelayError::Busy);
        }
        self.release_result();
        self.file = None;
        self.state = SessionState::Idle;
        self.view = ViewState::initial();
        Ok(())
    }

    /// Reserve the session for a checkout. Only valid with a staged file.
    ///
    /// # Errors
    /// - `Busy` while a run or checkout is in progress
    /// - `InvalidInput` when nothing is staged
    pub fn begin_checkout(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.checkout_open = true;
        self.view.actions_enabled = false;
        Ok(())
    }

    /// Release a checkout reservation, whatever its outcome
    pub fn finish_checkout(&mut self) {
        if self.checkout_open {
            self.checkout_open = false;
            self.view.actions_enabled = true;
        }
    }

    /// Enter processing and hand out the file to submit
    ///
    /// # Errors
    /// - `Busy` while a run or checkout is in progress; the state is unchanged
    /// - `InvalidInput` when nothing is staged; the state is unchanged
    pub fn begin_processing(&mut self, tier: Tier) -> Result<UploadedFile> {
        let file = self.ensure_ready()?.clone();
        self.state = SessionState::Processing;
        self.last_tier = Some(tier);
        self.view = ViewState::processing();
        Ok(file)
    }

    /// Mirror the decorative progress into the view. Ignored outside processing.
    pub fn set_progress(&mut self, percent: u8) {
        if self.state == SessionState::Processing {
            self.view.progress_percent = percent.min(100);
        }
    }

    /// Show a result, registering a fresh object URL for it
    ///
    /// # Errors
    /// - `Internal` if the session is not processing
    pub fn complete(&mut self, image: ResultImage, elapsed: Duration) -> Result<ObjectUrl> {
        if self.state != SessionState::Processing {
            return Err(RelayError::internal(format!(
                "Cannot complete a run from the {:?} state",
                self.state
            )));
        }
        self.release_result();
        let url = self.urls.create(image);
        self.result_url = Some(url.clone());
        self.state = SessionState::Result;
        self.view = ViewState::result(elapsed);
        Ok(url)
    }

    /// Return to the staged file after a failed run
    pub fn fail(&mut self, elapsed: Duration) {
        if self.state != SessionState::Processing {
            return;
        }
        self.state = SessionState::Staged;
        self.view = ViewState {
            time_taken: Some(time_taken_label(elapsed)),
            ..ViewState::staged()
        };
    }

    /// Return to the initial state, releasing the result
    ///
    /// # Errors
    /// - `Busy` while a run or checkout is in progress; a started submission
    ///   has to resolve first
    pub fn reset(&mut self) -> Result<()> {
        if self.is_busy() {
            return Err(RelayError::Busy);
        }
        self.release_result();
        self.file = None;
        self.last_tier = None;
        self.state = SessionState::Idle;
        self.view = ViewState::initial();
        Ok(())
    }

    fn ensure_ready(&self) -> Result<&UploadedFile> {
        if self.is_busy() {
            return Err(RelayError::Busy);
        }
        self.file
            .as_ref()
            .ok_or_else(|| RelayError::invalid_input("Please upload an image first."))
    }

    fn release_result(&mut self) {
        if let Some(url) = self.result_url.take() {
            self.urls.revoke(&url);
        }
    }
}
