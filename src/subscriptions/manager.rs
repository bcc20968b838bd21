//! Subscription manager for broadcasting feed snapshots.

use crate::error::SubscriptionError;
use crate::types::{FeedOrder, Snapshot, StoredEvent};
use crossbeam_channel::{bounded, Sender};
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{ChangeListener, Subscription, SubscriptionConfig, SubscriptionId};

/// Internal listener state.
struct Listener {
    id: SubscriptionId,
    order: FeedOrder,
    /// Reentrant so a callback may close its own subscription.
    on_change: ReentrantMutex<RefCell<ChangeListener>>,
    errors: Sender<SubscriptionError>,
    active: AtomicBool,
}

impl Listener {
    /// Hand a snapshot to the callback unless the listener was closed.
    fn deliver(&self, snapshot: Snapshot) {
        let guard = self.on_change.lock();
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        // A nested delivery on the same thread is skipped; the outer call
        // already carries an equally recent snapshot.
        if let Ok(mut callback) = guard.try_borrow_mut() {
            (*callback)(snapshot);
        };
    }

    /// Report an error. Dropped if the error buffer is full.
    fn report(&self, error: SubscriptionError) {
        if self.errors.try_send(error).is_err() {
            tracing::debug!(subscription = self.id.0, "subscription error buffer full");
        }
    }

    /// Stop deliveries, waiting out one in flight on another thread.
    fn deactivate(&self) {
        let _guard = self.on_change.lock();
        self.active.store(false, Ordering::Release);
    }
}

/// Manages listeners and delivers full ordered snapshots to them.
///
/// Shared by every store backend. Callers serialize writes and deliveries
/// so that snapshots reach each listener in store order.
pub struct SubscriptionManager {
    /// Active listeners by ID.
    listeners: RwLock<HashMap<SubscriptionId, Arc<Listener>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener.
    ///
    /// Nothing is delivered yet; the store sends the initial snapshot with
    /// [`deliver_to`](Self::deliver_to).
    pub fn subscribe(
        self: &Arc<Self>,
        config: SubscriptionConfig,
        on_change: ChangeListener,
    ) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.error_buffer.max(1));

        let listener = Listener {
            id,
            order: config.order,
            on_change: ReentrantMutex::new(RefCell::new(on_change)),
            errors: sender,
            active: AtomicBool::new(true),
        };
        self.listeners.write().insert(id, Arc::new(listener));

        tracing::debug!(subscription = id.0, order = ?config.order, "listener attached");

        Subscription::attached(id, Arc::clone(self), receiver)
    }

    /// Detach a listener. Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let removed = self.listeners.write().remove(&id);
        if let Some(listener) = removed {
            listener.deactivate();
            tracing::debug!(subscription = id.0, "listener detached");
        }
    }

    /// Whether the listener is still attached.
    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.listeners.read().contains_key(&id)
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Send the current snapshot to one listener (initial delivery).
    pub fn deliver_to(&self, id: SubscriptionId, events: &[StoredEvent]) {
        let listener = self.listeners.read().get(&id).cloned();
        if let Some(listener) = listener {
            listener.deliver(Snapshot::ordered(events.to_vec(), listener.order));
        }
    }

    /// Send the recomputed snapshot to every listener, ordered per listener.
    pub fn broadcast(&self, events: &[StoredEvent]) {
        let listeners: Vec<Arc<Listener>> = self.listeners.read().values().cloned().collect();

        let mut by_order: HashMap<FeedOrder, Snapshot> = HashMap::new();
        for listener in listeners {
            let snapshot = by_order
                .entry(listener.order)
                .or_insert_with(|| Snapshot::ordered(events.to_vec(), listener.order))
                .clone();
            listener.deliver(snapshot);
        }
    }

    /// Detach every listener, reporting `error` to each.
    pub fn disconnect_all(&self, error: SubscriptionError) {
        let drained: Vec<Arc<Listener>> = self.listeners.write().drain().map(|(_, l)| l).collect();
        for listener in drained {
            listener.deactivate();
            listener.report(error.clone());
            tracing::debug!(subscription = listener.id.0, %error, "listener disconnected");
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
