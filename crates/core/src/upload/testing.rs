//! In-memory doubles for exercising the queue without I/O.
//!
//! Compiled for unit tests and behind the `test-utils` feature for
//! downstream crates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use sitecap_domain::{FileRef, ProgressEvent, QueueItem, Result, SitecapError, UploadError};

use super::ports::{ProgressObserver, QueueStore, Uploader};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// `FileRef` for a JPEG with the given display name.
pub fn sample_file(name: &str) -> FileRef {
    FileRef::new(format!("file:///captures/{name}"), "image/jpeg", name)
}

/// Queue store held in memory, with switchable read/write failures.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    items: Mutex<Vec<QueueItem>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<QueueItem>) -> Self {
        Self { items: Mutex::new(items), ..Self::default() }
    }

    /// Make every `load` fail as if the blob were corrupt.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every `save` fail as if the medium were unavailable.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current contents, ignoring any injected failure.
    pub fn snapshot(&self) -> Vec<QueueItem> {
        lock(&self.items).clone()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn load(&self) -> Result<Vec<QueueItem>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(SitecapError::Storage("corrupt queue blob".into()));
        }
        Ok(lock(&self.items).clone())
    }

    async fn save(&self, items: &[QueueItem]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SitecapError::Storage("queue medium unavailable".into()));
        }
        *lock(&self.items) = items.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Per-item failure plan for [`ScriptedUploader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    FailTimes(usize),
    AlwaysFail,
}

/// Uploader whose outcome per item is scripted up front.
///
/// Items without a plan succeed with `{"uploaded": <id>}`.
#[derive(Debug, Default)]
pub struct ScriptedUploader {
    plans: Mutex<HashMap<String, Plan>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `times` attempts for `item_id`, then succeed.
    pub fn fail_times(&self, item_id: &str, times: usize) {
        lock(&self.plans).insert(item_id.to_string(), Plan::FailTimes(times));
    }

    pub fn always_fail(&self, item_id: &str) {
        lock(&self.plans).insert(item_id.to_string(), Plan::AlwaysFail);
    }

    /// Item ids in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn calls_for(&self, item_id: &str) -> usize {
        lock(&self.calls).iter().filter(|id| id.as_str() == item_id).count()
    }
}

#[async_trait]
impl Uploader for ScriptedUploader {
    async fn upload(&self, item: &QueueItem) -> std::result::Result<Value, UploadError> {
        let attempt = {
            let mut calls = lock(&self.calls);
            calls.push(item.id.clone());
            calls.iter().filter(|id| **id == item.id).count()
        };

        match lock(&self.plans).get(&item.id).copied() {
            Some(Plan::AlwaysFail) => Err(UploadError::Network(format!("attempt {attempt} failed"))),
            Some(Plan::FailTimes(times)) if attempt <= times => {
                Err(UploadError::Network(format!("attempt {attempt} failed")))
            }
            _ => Ok(json!({ "uploaded": item.id })),
        }
    }
}

/// Observer that keeps every event it sees.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        lock(&self.events).clone()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        lock(&self.events).push(event.clone());
    }
}
