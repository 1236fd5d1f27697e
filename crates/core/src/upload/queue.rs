//! Queue operations over a [`QueueStore`].
//!
//! The store is the single source of truth: every operation reads the full
//! persisted list, modifies it, and writes it back. Read-modify-write cycles
//! are serialized through an async mutex so concurrent callers in the same
//! process do not lose updates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sitecap_domain::{
    Attributes, FileRef, ItemKind, ItemPatch, ItemStatus, QueueConfig, QueueItem, QueueStats,
    Result,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::ports::QueueStore;
use crate::clock::{Clock, SystemClock};

/// Persistent FIFO of pending uploads.
pub struct UploadQueue {
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
    write_lock: Mutex<()>,
}

impl UploadQueue {
    /// Create a queue over `store` using the system clock.
    pub fn new(store: Arc<dyn QueueStore>, config: QueueConfig) -> Self {
        Self { store, clock: Arc::new(SystemClock), config, write_lock: Mutex::new(()) }
    }

    /// Replace the clock used for `createdAt` / `lastAttemptAt`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a queue and, when configured, reset items left `processing` by
    /// a previous run.
    pub async fn open(store: Arc<dyn QueueStore>, config: QueueConfig) -> Result<Self> {
        let queue = Self::new(store, config);
        if queue.config.reset_stale_on_open {
            queue.recover_stale().await?;
        }
        Ok(queue)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Append a new `pending` item and persist it.
    #[instrument(skip(self, payload, attributes))]
    pub async fn enqueue(
        &self,
        kind: ItemKind,
        payload: FileRef,
        attributes: Attributes,
        project_id: &str,
    ) -> Result<QueueItem> {
        let item = QueueItem::new(kind, payload, attributes, project_id, self.now());

        let _guard = self.write_lock.lock().await;
        let mut items = self.load_or_empty().await;
        items.push(item.clone());
        self.store.save(&items).await?;

        info!(item_id = %item.id, queue_len = items.len(), "Upload enqueued");
        Ok(item)
    }

    /// Full persisted queue, oldest first.
    pub async fn list_all(&self) -> Vec<QueueItem> {
        self.load_or_empty().await
    }

    pub async fn get(&self, id: &str) -> Option<QueueItem> {
        self.load_or_empty().await.into_iter().find(|item| item.id == id)
    }

    /// Merge `patch` into the item with `id`.
    ///
    /// Returns `Ok(None)` without writing when no such item exists.
    pub async fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<Option<QueueItem>> {
        self.modify_item(id, |item| {
            item.apply(patch);
            true
        })
        .await
    }

    /// Delete the item with `id`. Returns whether anything was removed.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_or_empty().await;
        let before = items.len();
        items.retain(|item| item.id != id);

        if items.len() == before {
            debug!("No queue item to remove");
            return Ok(false);
        }

        self.store.save(&items).await?;
        info!("Queue item removed");
        Ok(true)
    }

    /// Delete every `completed` item. Returns how many were removed.
    #[instrument(skip(self))]
    pub async fn prune_completed(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_or_empty().await;
        let before = items.len();
        items.retain(|item| item.status != ItemStatus::Completed);
        let removed = before - items.len();

        if removed > 0 {
            self.store.save(&items).await?;
            info!(removed, remaining = items.len(), "Pruned completed uploads");
        }

        Ok(removed)
    }

    /// Counts per status from the last persisted state.
    pub async fn stats(&self) -> QueueStats {
        QueueStats::from_items(&self.load_or_empty().await)
    }

    /// Put a parked item back in line with a fresh attempt budget.
    pub async fn reset_item(&self, id: &str) -> Result<Option<QueueItem>> {
        self.modify_item(id, |item| {
            item.reset_for_retry();
            true
        })
        .await
    }

    /// Reset every `processing` item to `pending`.
    ///
    /// An upload interrupted by a crash cannot be resumed, so those items are
    /// simply made eligible again. Attempt counts are kept.
    #[instrument(skip(self))]
    pub async fn recover_stale(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_or_empty().await;
        let mut recovered = 0;

        for item in items.iter_mut().filter(|item| item.status == ItemStatus::Processing) {
            item.status = ItemStatus::Pending;
            recovered += 1;
        }

        if recovered > 0 {
            self.store.save(&items).await?;
            warn!(recovered, "Reset uploads interrupted mid-flight");
        }

        Ok(recovered)
    }

    /// Apply `f` to the item with `id` and persist when `f` returns true.
    ///
    /// Returns the updated item, or `None` when the item is missing or `f`
    /// declined the change. Storage is untouched in the `None` case.
    pub(crate) async fn modify_item<F>(&self, id: &str, f: F) -> Result<Option<QueueItem>>
    where
        F: FnOnce(&mut QueueItem) -> bool + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_or_empty().await;

        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            debug!(item_id = %id, "Queue item not found");
            return Ok(None);
        };

        if !f(item) {
            return Ok(None);
        }

        let updated = item.clone();
        self.store.save(&items).await?;
        Ok(Some(updated))
    }

    /// Read the store, treating any failure as an empty queue.
    async fn load_or_empty(&self) -> Vec<QueueItem> {
        match self.store.load().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to load upload queue; starting from an empty queue");
                Vec::new()
            }
        }
    }
}
