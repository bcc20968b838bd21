//! Core types for the event feed.

use crate::error::{Result, StoreError, UploadError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Store-assigned identity of a persisted event.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        Timestamp(Utc::now().timestamp_micros())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A social event as stored in the collection.
///
/// The serialized form is exactly the five camelCase fields, with
/// `eventDate` as a number of epoch milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub event_date: DateTime<Utc>,
    pub event_location: String,
    pub event_description: String,
    pub event_image: Url,
}

impl EventRecord {
    /// Build a record, truncating the date to millisecond precision so that
    /// it reads back unchanged.
    pub fn new(
        name: impl Into<String>,
        date: DateTime<Utc>,
        location: impl Into<String>,
        description: impl Into<String>,
        image: Url,
    ) -> Self {
        Self {
            event_name: name.into(),
            event_date: truncate_to_millis(date),
            event_location: location.into(),
            event_description: description.into(),
            event_image: image,
        }
    }

    /// Check the persistence invariants: every text field non-blank and the
    /// image a durable http(s) URL.
    pub fn check(&self) -> Result<()> {
        for (field, value) in [
            ("eventName", &self.event_name),
            ("eventLocation", &self.event_location),
            ("eventDescription", &self.event_description),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::InvalidRecord(format!("{} is empty", field)));
            }
        }

        if !is_durable_url(&self.event_image) {
            return Err(StoreError::InvalidRecord(format!(
                "eventImage {} is not a durable URL",
                self.event_image
            )));
        }

        Ok(())
    }
}

/// Whether a URL can be fetched independently of the uploading client.
pub fn is_durable_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host().is_some()
}

fn truncate_to_millis(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or(date)
}

/// A persisted event together with its store metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: DocumentId,
    pub created: Timestamp,
    pub record: EventRecord,
}

impl Deref for StoredEvent {
    type Target = EventRecord;

    fn deref(&self) -> &EventRecord {
        &self.record
    }
}

/// Full ordered sequence of events at one point in time.
///
/// Snapshots are immutable; every change produces a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot(Arc<[StoredEvent]>);

impl Snapshot {
    /// Sort `events` by `order` and freeze them.
    pub fn ordered(mut events: Vec<StoredEvent>, order: FeedOrder) -> Self {
        order.sort(&mut events);
        Snapshot(events.into())
    }

    /// Document ids in feed order.
    pub fn ids(&self) -> Vec<DocumentId> {
        self.0.iter().map(|e| e.id).collect()
    }

    /// The bare records in feed order.
    pub fn records(&self) -> impl Iterator<Item = &EventRecord> + '_ {
        self.0.iter().map(|e| &e.record)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot(Arc::from(Vec::new()))
    }
}

impl Deref for Snapshot {
    type Target = [StoredEvent];

    fn deref(&self) -> &[StoredEvent] {
        &self.0
    }
}

/// Field a feed is ordered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKey {
    /// The event's own date.
    #[default]
    EventDate,
    /// Store creation order.
    Created,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Collection-level ordering of a feed.
///
/// Ties on the key fall back to ascending [`DocumentId`], so the order is
/// total and stable across snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedOrder {
    #[serde(default)]
    pub key: OrderKey,
    #[serde(default)]
    pub direction: Direction,
}

impl FeedOrder {
    pub fn new(key: OrderKey, direction: Direction) -> Self {
        Self { key, direction }
    }

    /// Newest events first.
    pub fn newest_first() -> Self {
        Self::new(OrderKey::Created, Direction::Descending)
    }

    pub fn compare(&self, a: &StoredEvent, b: &StoredEvent) -> Ordering {
        let by_key = match self.key {
            OrderKey::EventDate => a.record.event_date.cmp(&b.record.event_date),
            OrderKey::Created => a.created.cmp(&b.created),
        };
        let by_key = match self.direction {
            Direction::Ascending => by_key,
            Direction::Descending => by_key.reverse(),
        };
        by_key.then_with(|| a.id.cmp(&b.id))
    }

    pub fn sort(&self, events: &mut [StoredEvent]) {
        events.sort_by(|a, b| self.compare(a, b));
    }
}

/// Reference to an image on the local device, as returned by an image
/// picker. Accepts `file://` URIs and plain paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalImage {
    uri: String,
}

impl LocalImage {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Resolve to a filesystem path.
    pub fn to_path(&self) -> std::result::Result<PathBuf, UploadError> {
        if self.uri.trim().is_empty() {
            return Err(UploadError::InvalidReference("empty image reference".into()));
        }

        if !self.uri.contains("://") {
            return Ok(PathBuf::from(&self.uri));
        }

        let url = Url::parse(&self.uri)
            .map_err(|e| UploadError::InvalidReference(format!("{}: {}", self.uri, e)))?;
        if url.scheme() != "file" {
            return Err(UploadError::InvalidReference(format!(
                "unsupported scheme {} in {}",
                url.scheme(),
                self.uri
            )));
        }
        url.to_file_path()
            .map_err(|_| UploadError::InvalidReference(self.uri.clone()))
    }
}

impl From<PathBuf> for LocalImage {
    fn from(path: PathBuf) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }
}

/// Logical fields of the creation form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Name,
    Date,
    Location,
    Description,
    Image,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::Name => "name",
            FormField::Date => "date",
            FormField::Location => "location",
            FormField::Description => "description",
            FormField::Image => "image",
        };
        f.write_str(name)
    }
}
