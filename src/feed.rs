//! Live event feed for one presentation context.

use crate::error::SubscriptionError;
use crate::store::EventStore;
use crate::subscriptions::{Subscription, SubscriptionConfig};
use crate::types::Snapshot;
use tokio::sync::watch;

/// Owns one store listener and republishes its snapshots.
///
/// The listener is closed exactly once: by [`close`](Self::close) or, if the
/// owner goes away first, on drop.
pub struct FeedSubscription {
    subscription: Subscription,
    latest: watch::Receiver<Snapshot>,
}

impl FeedSubscription {
    /// Attach to `store`. The initial snapshot, if the store delivered one,
    /// is available immediately.
    pub async fn open(store: &dyn EventStore, config: SubscriptionConfig) -> Self {
        let (sender, mut latest) = watch::channel(Snapshot::default());

        let subscription = store
            .subscribe(
                config,
                Box::new(move |snapshot: Snapshot| {
                    sender.send_replace(snapshot);
                }),
            )
            .await;

        // The initial snapshot is what `latest()` shows; `changed()` waits
        // for the one after it.
        latest.borrow_and_update();

        if subscription.is_closed() {
            tracing::warn!("feed subscription did not attach; feed stays empty");
        }

        Self {
            subscription,
            latest,
        }
    }

    /// The most recent snapshot (empty until the first delivery).
    pub fn latest(&self) -> Snapshot {
        self.latest.borrow().clone()
    }

    /// Wait for a snapshot newer than the last one seen through `open` or
    /// `changed`. `None` once the feed is closed.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.latest.changed().await.ok()?;
        Some(self.latest.borrow_and_update().clone())
    }

    /// A receiver for presentation code that wants to watch independently.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.latest.clone()
    }

    /// Drain subscription errors. The feed keeps its last snapshot.
    pub fn errors(&self) -> Vec<SubscriptionError> {
        let errors = self.subscription.errors();
        for error in &errors {
            tracing::warn!(%error, "feed subscription error");
        }
        errors
    }

    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    /// Detach from the store. Idempotent.
    pub fn close(&mut self) {
        if !self.subscription.is_closed() {
            tracing::debug!("closing feed subscription");
        }
        self.subscription.close();
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.close();
    }
}
