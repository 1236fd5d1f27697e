//! End-to-end queue behaviour through the network gate.

mod support;

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use sitecap_core::upload::testing::{MemoryQueueStore, RecordingObserver, ScriptedUploader};
use sitecap_core::{Clock, UploadQueue};
use sitecap_domain::{
    ItemKind, ItemPatch, ItemStatus, PassSummary, ProgressStatus, QueueConfig, QueueStats,
};
use support::Harness;

#[tokio::test]
async fn flaky_item_completes_after_retries() {
    let harness = Harness::new();
    let first = harness.enqueue(ItemKind::Image, "wall.jpg", "p1").await;
    let second = harness.enqueue(ItemKind::Audio, "note.m4a", "p1").await;
    let third = harness.enqueue(ItemKind::Metadata, "site.json", "p1").await;
    let uploader = ScriptedUploader::new();
    uploader.fail_times(&second.id, 2);

    let pass1 = harness.gate.process_queue(&uploader, None).await;
    assert_eq!(pass1, PassSummary { processed: 2, failed: 1 });

    harness.clock.advance(Duration::minutes(1));
    let pass2 = harness.gate.process_queue(&uploader, None).await;
    assert_eq!(pass2, PassSummary { processed: 0, failed: 1 });

    harness.clock.advance(Duration::minutes(1));
    let pass3 = harness.gate.process_queue(&uploader, None).await;
    assert_eq!(pass3, PassSummary { processed: 1, failed: 0 });

    assert_eq!(
        harness.queue().stats().await,
        QueueStats { total: 3, pending: 0, processing: 0, failed: 0, completed: 3 }
    );

    let stored = harness.queue().get(&second.id).await.unwrap();
    assert_eq!(stored.attempt_count, 3);
    assert_eq!(stored.last_attempt_at, Some(harness.clock.now()));
    assert_eq!(uploader.calls_for(&first.id), 1);
    assert_eq!(uploader.calls_for(&third.id), 1);
}

#[tokio::test]
async fn permanently_failing_item_stops_at_cap() {
    let harness = Harness::new();
    let item = harness.enqueue_image("broken.jpg").await;
    let uploader = ScriptedUploader::new();
    uploader.always_fail(&item.id);

    for _ in 0..3 {
        harness.gate.process_queue(&uploader, None).await;
    }
    let fourth = harness.gate.process_queue(&uploader, None).await;

    assert_eq!(fourth, PassSummary::default());
    assert_eq!(uploader.calls_for(&item.id), 3);
    let stored = harness.queue().get(&item.id).await.unwrap();
    assert_eq!(stored.status, ItemStatus::Failed);
    assert_eq!(stored.attempt_count, 3);
    assert_eq!(stored.last_error.as_deref(), Some("network failure: attempt 3 failed"));

    let reset = harness.queue().reset_item(&item.id).await.unwrap().unwrap();
    assert_eq!(reset.status, ItemStatus::Pending);
    assert_eq!(reset.attempt_count, 0);
}

#[tokio::test]
async fn offline_then_online() {
    let harness = Harness::new();
    harness.enqueue_image("one.jpg").await;
    let uploader = ScriptedUploader::new();
    harness.probe.set_connected(false);

    let offline = harness.gate.process_queue(&uploader, None).await;
    assert_eq!(offline, PassSummary::default());
    assert_eq!(harness.queue().stats().await.pending, 1);
    assert_eq!(harness.store.save_count(), 1);

    harness.probe.set_connected(true);
    let online = harness.gate.process_queue(&uploader, None).await;
    assert_eq!(online, PassSummary { processed: 1, failed: 0 });
}

#[tokio::test]
async fn reopen_recovers_interrupted_attempt() {
    let store = Arc::new(MemoryQueueStore::new());
    let harness = Harness::with_store(store.clone());
    let item = harness.enqueue_image("one.jpg").await;
    harness
        .queue()
        .update_item(&item.id, &ItemPatch::new().status(ItemStatus::Processing).attempt_count(1))
        .await
        .unwrap();

    let reopened = UploadQueue::open(store, QueueConfig::default()).await.unwrap();

    let stored = reopened.get(&item.id).await.unwrap();
    assert_eq!(stored.status, ItemStatus::Pending);
    assert_eq!(stored.attempt_count, 1);
}

#[tokio::test]
async fn progress_then_prune() {
    let harness = Harness::new();
    let item = harness.enqueue_image("one.jpg").await;
    let observer = RecordingObserver::new();

    harness.gate.process_queue(&ScriptedUploader::new(), Some(&observer)).await;

    let events = observer.events();
    let statuses: Vec<_> = events.iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![ProgressStatus::Processing, ProgressStatus::Completed]);
    assert_eq!(events[1].result, Some(json!({ "uploaded": item.id })));

    assert_eq!(harness.queue().prune_completed().await.unwrap(), 1);
    assert_eq!(harness.queue().stats().await.total, 0);
}
