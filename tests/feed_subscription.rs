//! Feed subscription lifecycle and snapshot ordering.

mod common;

use common::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use socials::{
    DocumentId, EventStore, FeedOrder, FeedSubscription, MemoryEventStore, Snapshot,
    SocialsContext, SubscriptionConfig, SubscriptionError,
};
use std::sync::Arc;

#[tokio::test]
async fn test_initial_snapshot_is_available_on_open() {
    init_tracing();
    let store = MemoryEventStore::new();
    store.write(sample_record("Concert", 9)).await.unwrap();
    store.write(sample_record("Picnic", 1)).await.unwrap();

    let feed = FeedSubscription::open(&store, SubscriptionConfig::default()).await;

    let names: Vec<_> = feed.latest().records().map(|r| r.event_name.clone()).collect();
    assert_eq!(names, vec!["Picnic", "Concert"]);
    assert!(!feed.is_closed());
    assert_eq!(store.subscription_count(), 1);
}

#[tokio::test]
async fn test_empty_collection_yields_empty_snapshot() {
    let store = MemoryEventStore::new();
    let feed = FeedSubscription::open(&store, SubscriptionConfig::default()).await;
    assert!(feed.latest().is_empty());
    assert!(feed.errors().is_empty());
}

#[tokio::test]
async fn test_feed_republishes_after_write() {
    let store = MemoryEventStore::new();
    let mut feed = FeedSubscription::open(&store, SubscriptionConfig::default()).await;

    let id = store.write(sample_record("Picnic", 1)).await.unwrap();

    let snapshot = feed.changed().await.unwrap();
    assert_eq!(snapshot.ids(), vec![id]);
    assert_eq!(feed.latest().ids(), vec![id]);
}

#[tokio::test]
async fn test_watch_receiver_sees_updates() {
    let store = MemoryEventStore::new();
    let feed = FeedSubscription::open(&store, SubscriptionConfig::default()).await;
    let mut watcher = feed.watch();

    store.write(sample_record("Picnic", 1)).await.unwrap();

    watcher.changed().await.unwrap();
    assert_eq!(watcher.borrow().len(), 1);
}

#[tokio::test]
async fn test_newest_first_order() {
    let store = MemoryEventStore::new();
    let first = store.write(sample_record("Picnic", 1)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = store.write(sample_record("Concert", 9)).await.unwrap();

    let feed =
        FeedSubscription::open(&store, SubscriptionConfig::ordered(FeedOrder::newest_first()))
            .await;

    assert_eq!(feed.latest().ids(), vec![second, first]);
}

#[tokio::test]
async fn test_close_is_idempotent_and_stops_updates() {
    let store = MemoryEventStore::new();
    store.write(sample_record("Picnic", 1)).await.unwrap();
    let mut feed = FeedSubscription::open(&store, SubscriptionConfig::default()).await;

    feed.close();
    feed.close();

    assert!(feed.is_closed());
    assert_eq!(store.subscription_count(), 0);
    assert!(feed.errors().is_empty());

    store.write(sample_record("Concert", 9)).await.unwrap();

    // Last snapshot kept, no further deliveries.
    assert_eq!(feed.latest().len(), 1);
    assert!(feed.changed().await.is_none());
}

#[tokio::test]
async fn test_drop_detaches_listener() {
    let store = MemoryEventStore::new();
    let feed = FeedSubscription::open(&store, SubscriptionConfig::default()).await;
    assert_eq!(store.subscription_count(), 1);

    drop(feed);

    assert_eq!(store.subscription_count(), 0);
    store.write(sample_record("Picnic", 1)).await.unwrap();
}

#[tokio::test]
async fn test_rejected_attach_leaves_feed_empty() {
    init_tracing();
    let store = FlakyStore::new();
    store.inner.write(sample_record("Picnic", 1)).await.unwrap();
    store.reject_subscribe(true);

    let mut feed = FeedSubscription::open(&store, SubscriptionConfig::default()).await;

    assert!(feed.is_closed());
    assert!(feed.latest().is_empty());
    assert_eq!(
        feed.errors(),
        vec![SubscriptionError::Rejected("permission denied".into())]
    );
    assert!(feed.changed().await.is_none());
    feed.close();
}

#[tokio::test]
async fn test_shutdown_disconnects_but_keeps_last_snapshot() {
    let store = MemoryEventStore::new();
    store.write(sample_record("Picnic", 1)).await.unwrap();
    let mut feed = FeedSubscription::open(&store, SubscriptionConfig::default()).await;

    store.shutdown();

    assert!(feed.is_closed());
    assert_eq!(feed.errors(), vec![SubscriptionError::Disconnected]);
    assert_eq!(feed.latest().len(), 1);
    assert!(feed.changed().await.is_none());

    let late = FeedSubscription::open(&store, SubscriptionConfig::default()).await;
    assert!(late.is_closed());
    assert!(matches!(
        late.errors().as_slice(),
        [SubscriptionError::Rejected(_)]
    ));
}

#[tokio::test]
async fn test_created_event_reaches_open_feed() {
    let harness = Harness::new();
    let context = SocialsContext::new(
        harness.store.clone(),
        harness.uploader.clone(),
        SubscriptionConfig::default(),
    );
    let mut feed = context.feed().await;
    assert!(feed.latest().is_empty());

    let mut workflow =
        context.start_creation(harness.navigator.clone(), harness.feedback.clone());
    assert_eq!(harness.navigator.create_count(), 1);

    fill_picnic(&mut workflow);
    let id = workflow.submit().await.unwrap();

    let snapshot = feed.changed().await.unwrap();
    assert_eq!(snapshot.ids(), vec![id]);
    assert_eq!(snapshot[0].event_name, "Picnic");
    assert_eq!(harness.navigator.back_count(), 1);
}

#[tokio::test]
async fn test_independent_feeds_are_independent() {
    let store = MemoryEventStore::new();
    let mut a = FeedSubscription::open(&store, SubscriptionConfig::default()).await;
    let mut b = FeedSubscription::open(&store, SubscriptionConfig::default()).await;

    a.close();
    let id = store.write(sample_record("Picnic", 1)).await.unwrap();

    assert_eq!(b.changed().await.unwrap().ids(), vec![id]);
    assert!(a.latest().is_empty());
}

fn is_sorted(snapshot: &Snapshot, order: FeedOrder) -> bool {
    snapshot
        .windows(2)
        .all(|pair| order.compare(&pair[0], &pair[1]) != std::cmp::Ordering::Greater)
}

/// Ids shared by two snapshots appear in the same relative order in both.
fn same_relative_order(earlier: &[DocumentId], later: &[DocumentId]) -> bool {
    let kept: Vec<_> = later.iter().filter(|id| earlier.contains(id)).copied().collect();
    kept == earlier
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_every_snapshot_is_ordered(
        days in prop::collection::vec(1u32..=28, 1..12),
        newest_first in any::<bool>(),
    ) {
        let order = if newest_first { FeedOrder::newest_first() } else { FeedOrder::default() };
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let snapshots = runtime.block_on(async {
            let store = MemoryEventStore::new();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);

            let _subscription = store
                .subscribe(
                    SubscriptionConfig::ordered(order),
                    Box::new(move |snapshot: Snapshot| sink.lock().push(snapshot)),
                )
                .await;

            for (i, day) in days.iter().enumerate() {
                store.write(sample_record(&format!("event {i}"), *day)).await.unwrap();
            }

            let snapshots = seen.lock().clone();
            snapshots
        });

        // Initial empty snapshot plus one per write.
        prop_assert_eq!(snapshots.len(), days.len() + 1);

        for (i, snapshot) in snapshots.iter().enumerate() {
            prop_assert_eq!(snapshot.len(), i);
            prop_assert!(is_sorted(snapshot, order));
        }

        for pair in snapshots.windows(2) {
            prop_assert!(same_relative_order(&pair[0].ids(), &pair[1].ids()));
        }
    }
}
