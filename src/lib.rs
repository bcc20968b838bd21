//! # Socials
//!
//! Realtime feed and creation pipeline for small-group social events.
//!
//! ## Core Concepts
//!
//! - **Event records**: name, date, location, description and a durable
//!   image URL; create-only
//! - **Event store**: ordered full-snapshot subscriptions plus single-record
//!   writes
//! - **Asset uploader**: local image in, public URL out
//! - **Creation workflow**: validate → upload → persist → report, one
//!   independent attempt per submit
//! - **Feed subscription**: one listener per screen, closed exactly once
//!
//! ## Example
//!
//! ```ignore
//! use socials::{SocialsConfig, SocialsContext};
//!
//! let context = SocialsContext::open(&SocialsConfig::load("socials.toml")?.with_env())?;
//!
//! // Feed screen
//! let mut feed = context.feed().await;
//! render(feed.latest());
//!
//! // Creation screen
//! let mut workflow = context.new_event(navigator, feedback);
//! workflow.form_mut().name = "Picnic".into();
//! workflow.pick_date(&date_picker).await;
//! workflow.pick_image(&image_picker).await;
//! workflow.submit().await?;
//! ```

pub mod blobs;
pub mod config;
pub mod context;
pub mod error;
pub mod feed;
pub mod presentation;
pub mod records;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod workflow;

// Re-exports
pub use blobs::{Asset, AssetConfig, AssetStorage, AssetUploader, LocalAssetUploader};
pub use config::SocialsConfig;
pub use context::SocialsContext;
pub use error::{
    ConfigError, CreationError, Result, SocialsError, StoreError, SubscriptionError, UploadError,
    ValidationError,
};
pub use feed::FeedSubscription;
pub use presentation::{DatePicker, Feedback, ImagePicker, Navigator};
pub use records::DocumentLog;
pub use store::{EventStore, LocalEventStore, MemoryEventStore, StoreConfig};
pub use subscriptions::{
    ChangeListener, Subscription, SubscriptionConfig, SubscriptionId, SubscriptionManager,
};
pub use types::*;
pub use workflow::{
    CreationState, CreationWorkflow, EventForm, FailureReason, PERSIST_FAILED_MESSAGE,
    UPLOAD_FAILED_MESSAGE,
};
