//! Shared fakes and fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use socials::{
    ChangeListener, CreationState, CreationWorkflow, DatePicker, DocumentId, EventRecord,
    EventStore, Feedback, ImagePicker, LocalImage, MemoryEventStore, Navigator, StoreError,
    Subscription, SubscriptionConfig, SubscriptionError, UploadError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn picnic_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

pub fn sample_record(name: &str, day: u32) -> EventRecord {
    EventRecord::new(
        name,
        Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap(),
        "Park",
        "Bring snacks",
        Url::parse("https://assets.example.com/socials/sample.jpg").unwrap(),
    )
}

/// Fill every field with the picnic scenario.
pub fn fill_picnic(workflow: &mut CreationWorkflow) {
    let form = workflow.form_mut();
    form.name = "Picnic".into();
    form.date = Some(picnic_date());
    form.location = "Park".into();
    form.description = "Bring snacks".into();
    form.image = Some(LocalImage::new("file:///photos/picnic.jpg"));
}

// --- Uploader ---

/// Uploader that never touches the filesystem and counts calls.
pub struct FakeUploader {
    calls: AtomicUsize,
    failure: Mutex<Option<String>>,
    fixed_url: Option<Url>,
    uploaded: Mutex<Vec<LocalImage>>,
}

impl FakeUploader {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
            fixed_url: None,
            uploaded: Mutex::new(Vec::new()),
        }
    }

    /// Every upload resolves to `url`.
    pub fn returning(url: &str) -> Self {
        Self {
            fixed_url: Some(Url::parse(url).unwrap()),
            ..Self::new()
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    pub fn succeed(&self) {
        *self.failure.lock() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploaded(&self) -> Vec<LocalImage> {
        self.uploaded.lock().clone()
    }
}

#[async_trait]
impl socials::AssetUploader for FakeUploader {
    async fn upload(&self, image: &LocalImage) -> Result<Url, UploadError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(message) = self.failure.lock().clone() {
            return Err(UploadError::Transport(message));
        }

        self.uploaded.lock().push(image.clone());
        match &self.fixed_url {
            Some(url) => Ok(url.clone()),
            None => Ok(Url::parse(&format!("https://assets.example.com/socials/asset-{}.jpg", n))
                .unwrap()),
        }
    }
}

// --- Store ---

/// Memory store with switchable write and attach failures.
pub struct FlakyStore {
    pub inner: MemoryEventStore,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    reject_subscribe: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryEventStore::new(),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            reject_subscribe: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn reject_subscribe(&self, reject: bool) {
        self.reject_subscribe.store(reject, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn subscribe(
        &self,
        config: SubscriptionConfig,
        on_change: ChangeListener,
    ) -> Subscription {
        if self.reject_subscribe.load(Ordering::SeqCst) {
            return Subscription::detached(SubscriptionError::Rejected(
                "permission denied".into(),
            ));
        }
        self.inner.subscribe(config, on_change).await
    }

    async fn write(&self, record: EventRecord) -> Result<DocumentId, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("deadline exceeded".into()));
        }
        self.inner.write(record).await
    }
}

// --- Presentation ---

#[derive(Default)]
pub struct RecordingNavigator {
    back: AtomicUsize,
    to_create: AtomicUsize,
}

impl RecordingNavigator {
    pub fn back_count(&self) -> usize {
        self.back.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.to_create.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_back(&self) {
        self.back.fetch_add(1, Ordering::SeqCst);
    }

    fn navigate_to_create(&self) {
        self.to_create.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingFeedback {
    messages: Mutex<Vec<String>>,
    states: Mutex<Vec<CreationState>>,
}

impl RecordingFeedback {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn states(&self) -> Vec<CreationState> {
        self.states.lock().clone()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
        self.states.lock().clear();
    }
}

impl Feedback for RecordingFeedback {
    fn show_transient_message(&self, text: &str) {
        self.messages.lock().push(text.to_string());
    }

    fn state_changed(&self, state: &CreationState) {
        self.states.lock().push(*state);
    }
}

pub struct FixedImagePicker(pub Option<LocalImage>);

#[async_trait]
impl ImagePicker for FixedImagePicker {
    async fn pick_local_image(&self) -> Option<LocalImage> {
        self.0.clone()
    }
}

pub struct FixedDatePicker(pub Option<DateTime<Utc>>);

#[async_trait]
impl DatePicker for FixedDatePicker {
    async fn pick_date(&self) -> Option<DateTime<Utc>> {
        self.0
    }
}

// --- Harness ---

/// A workflow wired to fakes, with handles to inspect them.
pub struct Harness {
    pub uploader: Arc<FakeUploader>,
    pub store: Arc<FlakyStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub feedback: Arc<RecordingFeedback>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_uploader(FakeUploader::new())
    }

    pub fn with_uploader(uploader: FakeUploader) -> Self {
        init_tracing();
        Self {
            uploader: Arc::new(uploader),
            store: Arc::new(FlakyStore::new()),
            navigator: Arc::new(RecordingNavigator::default()),
            feedback: Arc::new(RecordingFeedback::default()),
        }
    }

    pub fn workflow(&self) -> CreationWorkflow {
        CreationWorkflow::new(
            self.uploader.clone(),
            self.store.clone(),
            self.navigator.clone(),
            self.feedback.clone(),
        )
    }
}
