//! Capabilities consumed from the presentation layer.
//!
//! Screens, widgets and the navigation container live outside this crate.
//! The core only asks them to pick things, move between screens and show
//! short messages.

use crate::types::LocalImage;
use crate::workflow::CreationState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Lets the user choose an image from the device. `None` when cancelled.
#[async_trait]
pub trait ImagePicker: Send + Sync {
    async fn pick_local_image(&self) -> Option<LocalImage>;
}

/// Lets the user choose a date. `None` when cancelled.
#[async_trait]
pub trait DatePicker: Send + Sync {
    async fn pick_date(&self) -> Option<DateTime<Utc>>;
}

/// Screen navigation.
pub trait Navigator: Send + Sync {
    /// Leave the current screen.
    fn navigate_back(&self);

    /// Open the event creation screen from the feed.
    fn navigate_to_create(&self);
}

/// User-visible feedback.
pub trait Feedback: Send + Sync {
    /// Short message that disappears on its own (snackbar, toast).
    fn show_transient_message(&self, text: &str);

    /// Creation progress, e.g. to show a loading indicator while uploading.
    fn state_changed(&self, _state: &CreationState) {}
}
