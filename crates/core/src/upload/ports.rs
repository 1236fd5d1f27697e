//! Port interfaces for the upload queue

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;
use sitecap_domain::{ProgressEvent, QueueItem, Result, UploadError};

/// Durable storage for the whole queue.
///
/// Implementations persist the ordered item list as one unit: a `save`
/// either replaces the previous state entirely or leaves it readable.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Load the persisted queue, oldest first. A missing queue is `Ok(vec![])`.
    async fn load(&self) -> Result<Vec<QueueItem>>;

    /// Replace the persisted queue with `items`.
    async fn save(&self, items: &[QueueItem]) -> Result<()>;
}

/// Delivers one queued item to its remote destination.
///
/// The returned value is stored on the item verbatim. Implementations must
/// not mutate queue state themselves.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, item: &QueueItem) -> std::result::Result<Value, UploadError>;
}

/// Best-effort connectivity check consulted before a pass.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Fire-and-forget progress hook.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event);
    }
}

/// [`Uploader`] backed by an async closure that takes an owned item.
pub struct FnUploader<F> {
    f: F,
}

/// Wrap an async closure as an [`Uploader`].
///
/// ```
/// use serde_json::json;
/// use sitecap_core::upload::upload_fn;
/// use sitecap_domain::UploadError;
///
/// let uploader =
///     upload_fn(|item| async move { Ok::<_, UploadError>(json!({ "uploaded": item.id })) });
/// # let _ = uploader;
/// ```
pub fn upload_fn<F, Fut>(f: F) -> FnUploader<F>
where
    F: Fn(QueueItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, UploadError>> + Send + 'static,
{
    FnUploader { f }
}

#[async_trait]
impl<F, Fut> Uploader for FnUploader<F>
where
    F: Fn(QueueItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, UploadError>> + Send + 'static,
{
    async fn upload(&self, item: &QueueItem) -> std::result::Result<Value, UploadError> {
        (self.f)(item.clone()).await
    }
}
