//! Dependency root handed to the presentation layer.

use crate::blobs::{AssetUploader, LocalAssetUploader};
use crate::config::SocialsConfig;
use crate::error::SocialsError;
use crate::feed::FeedSubscription;
use crate::presentation::{Feedback, Navigator};
use crate::store::{EventStore, LocalEventStore};
use crate::subscriptions::SubscriptionConfig;
use crate::workflow::CreationWorkflow;
use std::sync::Arc;

/// Holds the injected store and uploader, and builds the two things screens
/// use: a [`FeedSubscription`] per feed screen and a [`CreationWorkflow`]
/// per creation screen.
#[derive(Clone)]
pub struct SocialsContext {
    store: Arc<dyn EventStore>,
    uploader: Arc<dyn AssetUploader>,
    feed: SubscriptionConfig,
}

impl SocialsContext {
    pub fn new(
        store: Arc<dyn EventStore>,
        uploader: Arc<dyn AssetUploader>,
        feed: SubscriptionConfig,
    ) -> Self {
        Self {
            store,
            uploader,
            feed,
        }
    }

    /// Open the local store and asset directory described by `config`.
    pub fn open(config: &SocialsConfig) -> Result<Self, SocialsError> {
        config.validate()?;

        let store = LocalEventStore::open_or_create(config.store.clone())?;
        let uploader = LocalAssetUploader::open(&config.assets)?;

        Ok(Self::new(Arc::new(store), Arc::new(uploader), config.feed))
    }

    /// Attach a feed with the configured ordering.
    pub async fn feed(&self) -> FeedSubscription {
        FeedSubscription::open(self.store.as_ref(), self.feed).await
    }

    /// Fresh workflow with its own empty form.
    pub fn new_event(
        &self,
        navigator: Arc<dyn Navigator>,
        feedback: Arc<dyn Feedback>,
    ) -> CreationWorkflow {
        CreationWorkflow::new(
            Arc::clone(&self.uploader),
            Arc::clone(&self.store),
            navigator,
            feedback,
        )
    }

    /// The feed screen's create action: open the creation screen and hand
    /// back the workflow that backs it.
    pub fn start_creation(
        &self,
        navigator: Arc<dyn Navigator>,
        feedback: Arc<dyn Feedback>,
    ) -> CreationWorkflow {
        navigator.navigate_to_create();
        self.new_event(navigator, feedback)
    }
}
