//! Document store abstraction and its backends.
//!
//! - [`EventStore`]: subscribe to ordered full snapshots, write new records
//! - [`MemoryEventStore`]: in-process collection, the default test double
//! - [`LocalEventStore`]: durable directory-backed collection

mod local;
mod memory;

pub use local::{LocalEventStore, StoreConfig};
pub use memory::MemoryEventStore;

use crate::error::{Result, StoreError, SubscriptionError};
use crate::subscriptions::{ChangeListener, Subscription, SubscriptionConfig, SubscriptionManager};
use crate::types::{DocumentId, EventRecord, FeedOrder, Snapshot, StoredEvent};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The remote collection of event documents.
///
/// Records are create-only: a write never replaces an existing document and
/// nothing is ever deleted.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Attach a listener.
    ///
    /// `on_change` is called once with the current ordered snapshot and again
    /// after every change with the full recomputed snapshot. Attach failures
    /// are reported through [`Subscription::errors`]; the listener then never
    /// fires.
    async fn subscribe(&self, config: SubscriptionConfig, on_change: ChangeListener)
        -> Subscription;

    /// Create a new document with a store-assigned identity.
    ///
    /// An `Err` means the record was not persisted.
    async fn write(&self, record: EventRecord) -> Result<DocumentId>;
}

/// In-memory view of a collection plus its listeners.
///
/// Writes and initial deliveries are serialized by `write_lock`, so every
/// listener sees snapshots in store order.
pub(crate) struct Collection {
    documents: RwLock<Vec<StoredEvent>>,
    subscriptions: Arc<SubscriptionManager>,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl Collection {
    pub(crate) fn new(documents: Vec<StoredEvent>) -> Self {
        Self {
            documents: RwLock::new(documents),
            subscriptions: Arc::new(SubscriptionManager::new()),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn attach(
        &self,
        config: SubscriptionConfig,
        on_change: ChangeListener,
    ) -> Subscription {
        let _lock = self.write_lock.lock();

        if self.closed.load(Ordering::Acquire) {
            return Subscription::detached(SubscriptionError::Rejected(
                "store has been shut down".into(),
            ));
        }

        let subscription = self.subscriptions.subscribe(config, on_change);
        if let Some(id) = subscription.id() {
            let documents = self.documents.read().clone();
            self.subscriptions.deliver_to(id, &documents);
        }
        subscription
    }

    /// Persist through `persist`, then publish the new snapshot.
    pub(crate) fn insert_with<F>(&self, persist: F) -> Result<StoredEvent>
    where
        F: FnOnce() -> Result<StoredEvent>,
    {
        let _lock = self.write_lock.lock();

        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        let document = persist()?;
        let documents = {
            let mut documents = self.documents.write();
            documents.push(document.clone());
            documents.clone()
        };
        self.subscriptions.broadcast(&documents);

        Ok(document)
    }

    pub(crate) fn shutdown(&self) {
        let _lock = self.write_lock.lock();
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.subscriptions
                .disconnect_all(SubscriptionError::Disconnected);
        }
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn snapshot(&self, order: FeedOrder) -> Snapshot {
        Snapshot::ordered(self.documents.read().clone(), order)
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }
}
