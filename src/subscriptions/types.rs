//! Subscription types for live feed updates.

use super::manager::SubscriptionManager;
use crate::error::SubscriptionError;
use crate::types::{FeedOrder, Snapshot};
use crossbeam_channel::{bounded, Receiver};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback receiving every full ordered snapshot.
///
/// Runs on the writer's task; it must not block.
pub type ChangeListener = Box<dyn FnMut(Snapshot) + Send>;

/// Configuration for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Ordering of every delivered snapshot.
    /// Default: event date ascending
    pub order: FeedOrder,

    /// Max buffered errors; further errors are dropped.
    /// Default: 16
    pub error_buffer: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            order: FeedOrder::default(),
            error_buffer: 16,
        }
    }
}

impl SubscriptionConfig {
    pub fn ordered(order: FeedOrder) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to one live listener.
///
/// [`close`](Subscription::close) detaches the listener and is idempotent.
/// Dropping the handle closes it.
pub struct Subscription {
    id: Option<SubscriptionId>,
    manager: Option<Arc<SubscriptionManager>>,
    errors: Receiver<SubscriptionError>,
}

impl Subscription {
    pub(crate) fn attached(
        id: SubscriptionId,
        manager: Arc<SubscriptionManager>,
        errors: Receiver<SubscriptionError>,
    ) -> Self {
        Self {
            id: Some(id),
            manager: Some(manager),
            errors,
        }
    }

    /// A subscription whose listener never attached. It only carries `error`.
    pub fn detached(error: SubscriptionError) -> Self {
        let (sender, errors) = bounded(1);
        let _ = sender.try_send(error);
        Self {
            id: None,
            manager: None,
            errors,
        }
    }

    /// `None` for a detached subscription.
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Whether no further snapshots can arrive.
    pub fn is_closed(&self) -> bool {
        match (&self.manager, self.id) {
            (Some(manager), Some(id)) => !manager.is_active(id),
            _ => true,
        }
    }

    /// Drain errors reported since the last call (non-blocking).
    pub fn errors(&self) -> Vec<SubscriptionError> {
        self.errors.try_iter().collect()
    }

    /// Detach the listener. No snapshot is delivered after this returns.
    pub fn close(&mut self) {
        if let Some(manager) = self.manager.take() {
            if let Some(id) = self.id {
                manager.unsubscribe(id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
