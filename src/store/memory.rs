//! In-process event store.

use super::{Collection, EventStore};
use crate::error::Result;
use crate::subscriptions::{ChangeListener, Subscription, SubscriptionConfig};
use crate::types::{DocumentId, EventRecord, FeedOrder, Snapshot, StoredEvent, Timestamp};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Event store that keeps documents in memory.
///
/// Same contract as any other backend: full ordered snapshots, store-assigned
/// ids, create-only writes. Nothing survives the process.
pub struct MemoryEventStore {
    collection: Collection,
    next_id: AtomicU64,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            collection: Collection::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current snapshot, without subscribing.
    pub fn snapshot(&self, order: FeedOrder) -> Snapshot {
        self.collection.snapshot(order)
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of attached listeners.
    pub fn subscription_count(&self) -> usize {
        self.collection.subscription_count()
    }

    /// Disconnect every listener and refuse further work.
    pub fn shutdown(&self) {
        self.collection.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.collection.is_shut_down()
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn subscribe(
        &self,
        config: SubscriptionConfig,
        on_change: ChangeListener,
    ) -> Subscription {
        self.collection.attach(config, on_change)
    }

    async fn write(&self, record: EventRecord) -> Result<DocumentId> {
        record.check()?;

        let document = self.collection.insert_with(|| {
            Ok(StoredEvent {
                id: DocumentId(self.next_id.fetch_add(1, Ordering::SeqCst)),
                created: Timestamp::now(),
                record,
            })
        })?;

        tracing::debug!(document = %document.id, "event stored in memory");
        Ok(document.id)
    }
}
