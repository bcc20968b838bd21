//! Subscription system for live feed updates.
//!
//! Every listener receives the full ordered snapshot of the collection: once
//! when it attaches, then again after every change. There are no diffs.
//!
//! Subscriptions support:
//! - Per-listener ordering (event date or creation order, either direction)
//! - Explicit, idempotent close (also on drop)
//! - A bounded error channel for attach failures and disconnects
//!
//! # Example
//!
//! ```ignore
//! let manager = Arc::new(SubscriptionManager::new());
//!
//! let mut subscription = manager.subscribe(
//!     SubscriptionConfig::ordered(FeedOrder::newest_first()),
//!     Box::new(|snapshot| println!("{} events", snapshot.len())),
//! );
//!
//! manager.broadcast(&events);
//! subscription.close();
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{ChangeListener, Subscription, SubscriptionConfig, SubscriptionId};
