//! Dispatcher: one sequential pass over eligible queue items.
//!
//! Each attempt is persisted as `processing` (with the incremented attempt
//! count) before the upload callback runs, and persisted again with the
//! outcome afterwards. Upload failures stay inside the pass; only a storage
//! failure aborts it.

use std::sync::Arc;

use sitecap_domain::{PassSummary, ProgressEvent, Result};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::ports::{ProgressObserver, Uploader};
use super::queue::UploadQueue;

pub struct Dispatcher {
    queue: Arc<UploadQueue>,
    pass_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(queue: Arc<UploadQueue>) -> Self {
        Self { queue, pass_lock: Mutex::new(()) }
    }

    pub fn queue(&self) -> &Arc<UploadQueue> {
        &self.queue
    }

    /// Attempt every eligible item once, in persisted order.
    ///
    /// Returns `{processed: 0, failed: 0}` when another pass is already
    /// running on this dispatcher or when the store fails mid-pass.
    #[instrument(skip_all)]
    pub async fn process_queue(
        &self,
        uploader: &dyn Uploader,
        observer: Option<&dyn ProgressObserver>,
    ) -> PassSummary {
        let Ok(_pass) = self.pass_lock.try_lock() else {
            warn!("Upload pass already running, skipping");
            return PassSummary::default();
        };

        match self.run_pass(uploader, observer).await {
            Ok(summary) => {
                if summary.attempted() > 0 {
                    info!(processed = summary.processed, failed = summary.failed, "Upload pass finished");
                }
                summary
            }
            Err(e) => {
                error!(error = %e, "Upload pass aborted by storage failure");
                PassSummary::default()
            }
        }
    }

    async fn run_pass(
        &self,
        uploader: &dyn Uploader,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<PassSummary> {
        let max_attempts = self.queue.config().max_attempts;
        let max_error_len = self.queue.config().max_error_len;

        let eligible: Vec<String> = self
            .queue
            .list_all()
            .await
            .into_iter()
            .filter(|item| item.is_eligible(max_attempts))
            .map(|item| item.id)
            .collect();

        if eligible.is_empty() {
            debug!("No eligible uploads");
            return Ok(PassSummary::default());
        }

        debug!(count = eligible.len(), "Starting upload pass");
        let mut summary = PassSummary::default();

        for id in eligible {
            let now = self.queue.now();
            let claimed = self
                .queue
                .modify_item(&id, |item| {
                    if !item.is_eligible(max_attempts) {
                        return false;
                    }
                    item.begin_attempt(now);
                    true
                })
                .await?;

            let Some(claimed) = claimed else {
                debug!(item_id = %id, "Upload no longer eligible, skipping");
                continue;
            };

            notify(observer, &ProgressEvent::processing(claimed.clone()));

            match uploader.upload(&claimed).await {
                Ok(result) => {
                    let stored = result.clone();
                    let updated = self
                        .queue
                        .modify_item(&id, move |item| {
                            item.complete(stored);
                            true
                        })
                        .await?;

                    summary.processed += 1;
                    debug!(item_id = %id, attempt = claimed.attempt_count, "Upload completed");
                    notify(observer, &ProgressEvent::completed(updated.unwrap_or(claimed), result));
                }
                Err(err) => {
                    let reason = truncate_reason(&err.to_string(), max_error_len);
                    let recorded = reason.clone();
                    let updated = self
                        .queue
                        .modify_item(&id, move |item| {
                            item.record_failure(recorded, max_attempts);
                            true
                        })
                        .await?;

                    summary.failed += 1;
                    warn!(
                        item_id = %id,
                        attempt = claimed.attempt_count,
                        max_attempts,
                        error = %reason,
                        "Upload attempt failed"
                    );
                    notify(observer, &ProgressEvent::failed(updated.unwrap_or(claimed), reason));
                }
            }
        }

        Ok(summary)
    }
}

fn notify(observer: Option<&dyn ProgressObserver>, event: &ProgressEvent) {
    if let Some(observer) = observer {
        observer.on_progress(event);
    }
}

fn truncate_reason(reason: &str, max_len: usize) -> String {
    if reason.chars().count() <= max_len {
        return reason.to_string();
    }

    let mut truncated = reason.chars().take(max_len.saturating_sub(3)).collect::<String>();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use sitecap_domain::{
        Attributes, ItemKind, ItemPatch, ItemStatus, ProgressStatus, QueueConfig, QueueItem,
        UploadError,
    };
    use tokio::sync::Notify;

    use super::*;
    use crate::upload::testing::{
        sample_file, MemoryQueueStore, RecordingObserver, ScriptedUploader,
    };

    fn dispatcher_over(store: Arc<MemoryQueueStore>) -> Dispatcher {
        Dispatcher::new(Arc::new(UploadQueue::new(store, QueueConfig::default())))
    }

    async fn enqueue(dispatcher: &Dispatcher, name: &str) -> QueueItem {
        dispatcher
            .queue()
            .enqueue(ItemKind::Image, sample_file(name), Attributes::new(), "p1")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn successful_upload_completes_item() {
        let dispatcher = dispatcher_over(Arc::new(MemoryQueueStore::new()));
        let item = enqueue(&dispatcher, "a.jpg").await;
        let uploader = ScriptedUploader::new();

        let summary = dispatcher.process_queue(&uploader, None).await;

        assert_eq!(summary, PassSummary { processed: 1, failed: 0 });
        let stored = dispatcher.queue().get(&item.id).await.unwrap();
        assert_eq!(stored.status, ItemStatus::Completed);
        assert_eq!(stored.attempt_count, 1);
        assert!(stored.last_attempt_at.is_some());
        assert_eq!(stored.result, Some(json!({ "uploaded": item.id })));
        assert_eq!(dispatcher.queue().stats().await.completed, 1);
    }

    #[tokio::test]
    async fn failures_requeue_until_cap_then_park() {
        let dispatcher = dispatcher_over(Arc::new(MemoryQueueStore::new()));
        let item = enqueue(&dispatcher, "a.jpg").await;
        let uploader = ScriptedUploader::new();
        uploader.always_fail(&item.id);

        for expected_attempt in 1..=2 {
            let summary = dispatcher.process_queue(&uploader, None).await;
            assert_eq!(summary, PassSummary { processed: 0, failed: 1 });

            let stored = dispatcher.queue().get(&item.id).await.unwrap();
            assert_eq!(stored.status, ItemStatus::Pending);
            assert_eq!(stored.attempt_count, expected_attempt);
            assert!(stored.last_error.is_some());
        }

        dispatcher.process_queue(&uploader, None).await;
        let stored = dispatcher.queue().get(&item.id).await.unwrap();
        assert_eq!(stored.status, ItemStatus::Failed);
        assert_eq!(stored.attempt_count, 3);

        let summary = dispatcher.process_queue(&uploader, None).await;
        assert_eq!(summary, PassSummary::default());
        assert_eq!(uploader.calls_for(&item.id), 3);
    }

    #[tokio::test]
    async fn one_item_exhausting_retries_does_not_block_others() {
        let dispatcher = dispatcher_over(Arc::new(MemoryQueueStore::new()));
        let bad = enqueue(&dispatcher, "bad.jpg").await;
        let good = enqueue(&dispatcher, "good.jpg").await;
        let uploader = ScriptedUploader::new();
        uploader.always_fail(&bad.id);

        let summary = dispatcher.process_queue(&uploader, None).await;

        assert_eq!(summary, PassSummary { processed: 1, failed: 1 });
        assert_eq!(uploader.calls(), vec![bad.id.clone(), good.id.clone()]);
        assert_eq!(
            dispatcher.queue().get(&good.id).await.unwrap().status,
            ItemStatus::Completed
        );
    }

    #[tokio::test]
    async fn processing_and_completed_items_are_skipped() {
        let dispatcher = dispatcher_over(Arc::new(MemoryQueueStore::new()));
        let in_flight = enqueue(&dispatcher, "a.jpg").await;
        let done = enqueue(&dispatcher, "b.jpg").await;
        let queue = dispatcher.queue();
        queue
            .update_item(&in_flight.id, &ItemPatch::new().status(ItemStatus::Processing))
            .await
            .unwrap();
        queue.update_item(&done.id, &ItemPatch::new().status(ItemStatus::Completed)).await.unwrap();
        let uploader = ScriptedUploader::new();

        let summary = dispatcher.process_queue(&uploader, None).await;

        assert_eq!(summary, PassSummary::default());
        assert!(uploader.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_item_below_cap_is_retried() {
        let dispatcher = dispatcher_over(Arc::new(MemoryQueueStore::new()));
        let item = enqueue(&dispatcher, "a.jpg").await;
        dispatcher
            .queue()
            .update_item(&item.id, &ItemPatch::new().status(ItemStatus::Failed).attempt_count(1))
            .await
            .unwrap();
        let uploader = ScriptedUploader::new();

        let summary = dispatcher.process_queue(&uploader, None).await;

        assert_eq!(summary.processed, 1);
        assert_eq!(dispatcher.queue().get(&item.id).await.unwrap().attempt_count, 2);
    }

    #[tokio::test]
    async fn progress_reports_each_stage() {
        let dispatcher = dispatcher_over(Arc::new(MemoryQueueStore::new()));
        let ok = enqueue(&dispatcher, "ok.jpg").await;
        let bad = enqueue(&dispatcher, "bad.jpg").await;
        let uploader = ScriptedUploader::new();
        uploader.always_fail(&bad.id);
        let observer = RecordingObserver::new();

        dispatcher.process_queue(&uploader, Some(&observer)).await;

        let events = observer.events();
        let stages: Vec<_> = events.iter().map(|e| (e.item.id.clone(), e.status)).collect();
        assert_eq!(
            stages,
            vec![
                (ok.id.clone(), ProgressStatus::Processing),
                (ok.id.clone(), ProgressStatus::Completed),
                (bad.id.clone(), ProgressStatus::Processing),
                (bad.id.clone(), ProgressStatus::Failed),
            ]
        );
        assert_eq!(events[0].item.status, ItemStatus::Processing);
        assert_eq!(events[0].item.attempt_count, 1);
        assert_eq!(events[1].result, Some(json!({ "uploaded": ok.id })));
        assert_eq!(events[3].item.status, ItemStatus::Pending);
        assert_eq!(events[3].error.as_deref(), Some("network failure: attempt 1 failed"));
    }

    #[tokio::test]
    async fn closure_observer_is_accepted() {
        let dispatcher = dispatcher_over(Arc::new(MemoryQueueStore::new()));
        enqueue(&dispatcher, "a.jpg").await;
        let seen = std::sync::atomic::AtomicUsize::new(0);
        let observer = |_: &ProgressEvent| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        };

        dispatcher.process_queue(&ScriptedUploader::new(), Some(&observer)).await;

        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn storage_failure_aborts_pass_with_zero_totals() {
        let store = Arc::new(MemoryQueueStore::new());
        let dispatcher = dispatcher_over(store.clone());
        enqueue(&dispatcher, "a.jpg").await;
        store.fail_saves(true);
        let uploader = ScriptedUploader::new();

        let summary = dispatcher.process_queue(&uploader, None).await;

        assert_eq!(summary, PassSummary::default());
        assert!(uploader.calls().is_empty());
    }

    #[tokio::test]
    async fn long_errors_are_truncated() {
        struct Verbose;

        #[async_trait]
        impl Uploader for Verbose {
            async fn upload(&self, _item: &QueueItem) -> std::result::Result<Value, UploadError> {
                Err(UploadError::other("x".repeat(1_000)))
            }
        }

        let dispatcher = dispatcher_over(Arc::new(MemoryQueueStore::new()));
        let item = enqueue(&dispatcher, "a.jpg").await;

        dispatcher.process_queue(&Verbose, None).await;

        let error = dispatcher.queue().get(&item.id).await.unwrap().last_error.unwrap();
        assert_eq!(error.chars().count(), 256);
        assert!(error.ends_with("..."));
    }

    #[tokio::test]
    async fn concurrent_pass_is_skipped() {
        struct Blocking {
            entered: Arc<Notify>,
            release: Arc<Notify>,
        }

        #[async_trait]
        impl Uploader for Blocking {
            async fn upload(&self, _item: &QueueItem) -> std::result::Result<Value, UploadError> {
                self.entered.notify_one();
                self.release.notified().await;
                Ok(Value::Null)
            }
        }

        let dispatcher = Arc::new(dispatcher_over(Arc::new(MemoryQueueStore::new())));
        enqueue(&dispatcher, "a.jpg").await;
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let blocking = Arc::new(Blocking { entered: entered.clone(), release: release.clone() });

        let first = {
            let dispatcher = dispatcher.clone();
            let blocking = blocking.clone();
            tokio::spawn(async move { dispatcher.process_queue(blocking.as_ref(), None).await })
        };
        entered.notified().await;

        let second = dispatcher.process_queue(&ScriptedUploader::new(), None).await;
        assert_eq!(second, PassSummary::default());

        release.notify_one();
        assert_eq!(first.await.unwrap(), PassSummary { processed: 1, failed: 0 });
    }

    #[test]
    fn truncate_reason_keeps_short_messages() {
        assert_eq!(truncate_reason("short", 10), "short");
        assert_eq!(truncate_reason("abcdefghijkl", 8), "abcde...");
    }
}
