//! Upload queue records and the values derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque key/value bag passed verbatim to the upload callback.
pub type Attributes = serde_json::Map<String, Value>;

/// Payload category of a queued upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Image,
    Audio,
    Metadata,
}

crate::impl_domain_status_conversions!(ItemKind {
    Image => "image",
    Audio => "audio",
    Metadata => "metadata"
});

/// Lifecycle status of a queued upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Failed,
    Completed,
}

crate::impl_domain_status_conversions!(ItemStatus {
    Pending => "pending",
    Processing => "processing",
    Failed => "failed",
    Completed => "completed"
});

/// Reference to a local file. The queue never reads the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub uri: String,
    /// Declared MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Display name.
    pub name: String,
}

impl FileRef {
    pub fn new(
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self { uri: uri.into(), mime_type: mime_type.into(), name: name.into() }
    }
}

/// One deferred unit of upload work.
///
/// Field names serialize in camelCase; aliases accept blobs written by older
/// clients (`type`, `file`, `metadata`, `attempts`, `lastAttempt`, `error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: ItemKind,
    #[serde(alias = "file")]
    pub payload: FileRef,
    #[serde(default, alias = "metadata")]
    pub attributes: Attributes,
    #[serde(default)]
    pub project_id: String,
    #[serde(default, alias = "attempts")]
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "lastAttempt")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub status: ItemStatus,
    #[serde(default, alias = "error")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl QueueItem {
    /// Build a fresh `pending` item with a time-ordered id.
    pub fn new(
        kind: ItemKind,
        payload: FileRef,
        attributes: Attributes,
        project_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            kind,
            payload,
            attributes,
            project_id: project_id.into(),
            attempt_count: 0,
            created_at,
            last_attempt_at: None,
            status: ItemStatus::Pending,
            last_error: None,
            result: None,
        }
    }

    /// Whether a dispatcher pass may attempt this item.
    ///
    /// `failed` items are only picked up again while they are below the cap,
    /// which happens after a caller edits them or raises the cap.
    pub fn is_eligible(&self, max_attempts: u32) -> bool {
        match self.status {
            ItemStatus::Pending => true,
            ItemStatus::Failed => self.attempt_count < max_attempts,
            ItemStatus::Processing | ItemStatus::Completed => false,
        }
    }

    /// Transition into `processing` for a new delivery attempt.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) {
        self.status = ItemStatus::Processing;
        self.last_attempt_at = Some(now);
        self.attempt_count = self.attempt_count.saturating_add(1);
    }

    pub fn complete(&mut self, result: Value) {
        self.status = ItemStatus::Completed;
        self.result = Some(result);
    }

    /// Record a failed attempt. Returns the status the item landed in.
    pub fn record_failure(&mut self, error: String, max_attempts: u32) -> ItemStatus {
        self.status = if self.attempt_count >= max_attempts {
            ItemStatus::Failed
        } else {
            ItemStatus::Pending
        };
        self.last_error = Some(error);
        self.status
    }

    /// Manual retry: back to `pending` with a fresh attempt budget.
    pub fn reset_for_retry(&mut self) {
        self.status = ItemStatus::Pending;
        self.attempt_count = 0;
        self.last_error = None;
    }

    /// Merge the fields set on `patch` into this item.
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(attempt_count) = patch.attempt_count {
            self.attempt_count = attempt_count;
        }
        if let Some(last_attempt_at) = patch.last_attempt_at {
            self.last_attempt_at = last_attempt_at;
        }
        if let Some(ref last_error) = patch.last_error {
            self.last_error.clone_from(last_error);
        }
        if let Some(ref result) = patch.result {
            self.result.clone_from(result);
        }
        if let Some(ref attributes) = patch.attributes {
            self.attributes.clone_from(attributes);
        }
        if let Some(ref project_id) = patch.project_id {
            self.project_id.clone_from(project_id);
        }
    }
}

/// Partial update for [`QueueItem`]; unset fields are left alone.
///
/// Nullable fields use `Option<Option<_>>` so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub status: Option<ItemStatus>,
    pub attempt_count: Option<u32>,
    pub last_attempt_at: Option<Option<DateTime<Utc>>>,
    pub last_error: Option<Option<String>>,
    pub result: Option<Option<Value>>,
    pub attributes: Option<Attributes>,
    pub project_id: Option<String>,
}

impl ItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn attempt_count(mut self, attempt_count: u32) -> Self {
        self.attempt_count = Some(attempt_count);
        self
    }

    pub fn last_attempt_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_attempt_at = Some(at);
        self
    }

    pub fn last_error(mut self, error: Option<String>) -> Self {
        self.last_error = Some(error);
        self
    }

    pub fn result(mut self, result: Option<Value>) -> Self {
        self.result = Some(result);
        self
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// True when applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Item counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub failed: usize,
    pub completed: usize,
}

impl QueueStats {
    pub fn from_items(items: &[QueueItem]) -> Self {
        items.iter().fold(Self { total: items.len(), ..Self::default() }, |mut stats, item| {
            match item.status {
                ItemStatus::Pending => stats.pending += 1,
                ItemStatus::Processing => stats.processing += 1,
                ItemStatus::Failed => stats.failed += 1,
                ItemStatus::Completed => stats.completed += 1,
            }
            stats
        })
    }
}

/// Totals for one dispatcher pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Uploads that completed during the pass.
    pub processed: usize,
    /// Attempts that failed during the pass (requeued or parked).
    pub failed: usize,
}

impl PassSummary {
    pub fn attempted(&self) -> usize {
        self.processed + self.failed
    }
}

/// Stage reported to a progress observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Failed,
}

crate::impl_domain_status_conversions!(ProgressStatus {
    Processing => "processing",
    Completed => "completed",
    Failed => "failed"
});

/// Progress notification emitted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub item: QueueItem,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn processing(item: QueueItem) -> Self {
        Self { item, status: ProgressStatus::Processing, result: None, error: None }
    }

    pub fn completed(item: QueueItem, result: Value) -> Self {
        Self { item, status: ProgressStatus::Completed, result: Some(result), error: None }
    }

    pub fn failed(item: QueueItem, error: String) -> Self {
        Self { item, status: ProgressStatus::Failed, result: None, error: Some(error) }
    }
}
