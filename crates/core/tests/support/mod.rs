//! Shared fixtures for `sitecap-core` integration tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use sitecap_core::clock::MockClock;
use sitecap_core::upload::testing::{sample_file, MemoryQueueStore};
use sitecap_core::{Dispatcher, NetworkGate, StaticConnectivity, UploadQueue};
use sitecap_domain::{Attributes, ItemKind, QueueConfig, QueueItem};

/// Store, clock and probe wired to one gate, with handles kept for assertions.
pub struct Harness {
    pub store: Arc<MemoryQueueStore>,
    pub clock: MockClock,
    pub probe: Arc<StaticConnectivity>,
    pub gate: NetworkGate,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryQueueStore::new()))
    }

    pub fn with_store(store: Arc<MemoryQueueStore>) -> Self {
        let clock = MockClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
        let queue = UploadQueue::new(store.clone(), QueueConfig::default())
            .with_clock(Arc::new(clock.clone()));
        let probe = Arc::new(StaticConnectivity::online());
        let gate = NetworkGate::new(probe.clone(), Dispatcher::new(Arc::new(queue)));
        Self { store, clock, probe, gate }
    }

    pub fn queue(&self) -> &UploadQueue {
        self.gate.queue()
    }

    pub async fn enqueue_image(&self, name: &str) -> QueueItem {
        self.enqueue(ItemKind::Image, name, "site-42").await
    }

    pub async fn enqueue(&self, kind: ItemKind, name: &str, project_id: &str) -> QueueItem {
        self.queue().enqueue(kind, sample_file(name), Attributes::new(), project_id).await.unwrap()
    }
}
