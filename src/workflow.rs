//! Event creation: validate, upload the image, persist the record, report.
//!
//! One [`CreationWorkflow`] backs one creation screen. Each submit is an
//! independent attempt that runs the whole pipeline again; a retry after a
//! failed write uploads the image again rather than reusing the first asset.

use crate::blobs::AssetUploader;
use crate::error::{CreationError, ValidationError};
use crate::presentation::{DatePicker, Feedback, ImagePicker, Navigator};
use crate::store::EventStore;
use crate::types::{DocumentId, EventRecord, FormField, LocalImage};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Message shown when the upload step fails.
pub const UPLOAD_FAILED_MESSAGE: &str = "Couldn't upload the image. Please try again.";

/// Message shown when the write step fails.
pub const PERSIST_FAILED_MESSAGE: &str = "Couldn't save the event. Please try again.";

/// Step at which an attempt failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    Validation,
    Upload,
    Persist,
}

/// State of the current creation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreationState {
    /// Form is being filled in. No side effects.
    Editing,
    Validating,
    Uploading,
    Persisting,
    Succeeded(DocumentId),
    Failed(FailureReason),
}

impl CreationState {
    /// Whether an attempt is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            CreationState::Validating | CreationState::Uploading | CreationState::Persisting
        )
    }
}

impl CreationError {
    pub fn reason(&self) -> FailureReason {
        match self {
            CreationError::Validation(_) => FailureReason::Validation,
            CreationError::Upload(_) => FailureReason::Upload,
            CreationError::Persist(_) => FailureReason::Persist,
        }
    }

    /// Text shown to the user. Never names the failing field or the
    /// underlying error.
    pub fn user_message(&self) -> String {
        match self {
            CreationError::Validation(e) => e.to_string(),
            CreationError::Upload(_) => UPLOAD_FAILED_MESSAGE.to_string(),
            CreationError::Persist(_) => PERSIST_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Values entered on the creation screen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventForm {
    pub name: String,
    pub date: Option<DateTime<Utc>>,
    pub location: String,
    pub description: String,
    pub image: Option<LocalImage>,
}

impl EventForm {
    /// Fields that are empty, blank or unselected.
    pub fn missing_fields(&self) -> Vec<FormField> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push(FormField::Name);
        }
        if self.date.is_none() {
            missing.push(FormField::Date);
        }
        if self.location.trim().is_empty() {
            missing.push(FormField::Location);
        }
        if self.description.trim().is_empty() {
            missing.push(FormField::Description);
        }
        if self.image.is_none() {
            missing.push(FormField::Image);
        }
        missing
    }

    /// The selected date and image, if every field is filled in.
    pub fn validate(&self) -> Result<(DateTime<Utc>, LocalImage), ValidationError> {
        let missing = self.missing_fields();
        match (&self.date, &self.image) {
            (Some(date), Some(image)) if missing.is_empty() => Ok((*date, image.clone())),
            _ => Err(ValidationError { missing }),
        }
    }
}

/// Drives one creation screen through
/// `Editing → Validating → Uploading → Persisting → Succeeded / Failed`.
pub struct CreationWorkflow {
    uploader: Arc<dyn AssetUploader>,
    store: Arc<dyn EventStore>,
    navigator: Arc<dyn Navigator>,
    feedback: Arc<dyn Feedback>,
    form: EventForm,
    state: CreationState,
    attempts: u64,
}

impl CreationWorkflow {
    pub fn new(
        uploader: Arc<dyn AssetUploader>,
        store: Arc<dyn EventStore>,
        navigator: Arc<dyn Navigator>,
        feedback: Arc<dyn Feedback>,
    ) -> Self {
        Self {
            uploader,
            store,
            navigator,
            feedback,
            form: EventForm::default(),
            state: CreationState::Editing,
            attempts: 0,
        }
    }

    pub fn state(&self) -> CreationState {
        self.state
    }

    pub fn form(&self) -> &EventForm {
        &self.form
    }

    /// Number of submits so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Edit the form. Returns the workflow to `Editing`.
    pub fn form_mut(&mut self) -> &mut EventForm {
        if self.state != CreationState::Editing {
            self.transition(CreationState::Editing);
        }
        &mut self.form
    }

    /// Ask the user for an image. A cancelled picker leaves the form as is.
    pub async fn pick_image(&mut self, picker: &dyn ImagePicker) -> bool {
        match picker.pick_local_image().await {
            Some(image) => {
                self.form_mut().image = Some(image);
                true
            }
            None => false,
        }
    }

    /// Ask the user for a date. A cancelled picker leaves the form as is.
    pub async fn pick_date(&mut self, picker: &dyn DatePicker) -> bool {
        match picker.pick_date().await {
            Some(date) => {
                self.form_mut().date = Some(date);
                true
            }
            None => false,
        }
    }

    /// Abandon the form and leave the screen.
    pub fn dismiss(&self) {
        self.navigator.navigate_back();
    }

    /// Run one attempt.
    ///
    /// On success the caller has already been navigated back; on failure
    /// the user has been shown a message and the form is kept for another
    /// try.
    pub async fn submit(&mut self) -> Result<DocumentId, CreationError> {
        self.attempts += 1;
        let attempt = self.attempts;

        let result = self.run(attempt).await;
        match &result {
            Ok(id) => {
                self.transition(CreationState::Succeeded(*id));
                self.navigator.navigate_back();
            }
            Err(e) => {
                self.transition(CreationState::Failed(e.reason()));
                self.feedback.show_transient_message(&e.user_message());
            }
        }
        result
    }

    async fn run(&mut self, attempt: u64) -> Result<DocumentId, CreationError> {
        self.transition(CreationState::Validating);
        let (date, image) = self.form.validate().map_err(|e| {
            tracing::debug!(attempt, missing = ?e.missing, "event form incomplete");
            e
        })?;

        self.transition(CreationState::Uploading);
        let image_url = self.uploader.upload(&image).await.map_err(|e| {
            tracing::warn!(attempt, error = %e, "image upload failed");
            e
        })?;

        self.transition(CreationState::Persisting);
        let record = EventRecord::new(
            self.form.name.clone(),
            date,
            self.form.location.clone(),
            self.form.description.clone(),
            image_url.clone(),
        );
        let id = self.store.write(record).await.map_err(|e| {
            tracing::warn!(
                attempt,
                error = %e,
                orphaned_asset = %image_url,
                "event write failed after upload"
            );
            CreationError::Persist(e)
        })?;

        tracing::info!(attempt, document = %id, "event created");
        Ok(id)
    }

    fn transition(&mut self, state: CreationState) {
        tracing::debug!(from = ?self.state, to = ?state, "creation state");
        self.state = state;
        self.feedback.state_changed(&state);
    }
}
