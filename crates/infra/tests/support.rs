use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sitecap_core::Uploader;
use sitecap_domain::{Attributes, FileRef, ItemKind, QueueItem, StoreBackend, StoreConfig, UploadError};
use tempfile::TempDir;

/// Temporary directory that keeps store files alive for the duration of a
/// test run.
pub struct TestStoreDir {
    dir: TempDir,
}

impl TestStoreDir {
    pub fn new() -> Self {
        Self { dir: TempDir::new().expect("temp dir should be created") }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Store configuration for `backend` rooted in this directory.
    pub fn config(&self, backend: StoreBackend) -> StoreConfig {
        let file = match backend {
            StoreBackend::File => "upload_queue.json",
            StoreBackend::Sqlite => "sitecap.db",
        };
        StoreConfig { backend, path: self.path(file), ..StoreConfig::default() }
    }
}

impl Default for TestStoreDir {
    fn default() -> Self {
        Self::new()
    }
}

pub fn photo(name: &str) -> (ItemKind, FileRef, Attributes) {
    let mut attributes = Attributes::new();
    attributes.insert("caption".into(), json!(format!("north wall {name}")));
    (
        ItemKind::Image,
        FileRef::new(format!("file:///captures/{name}"), "image/jpeg", name),
        attributes,
    )
}

/// Uploader that posts item metadata to `<base>/uploads`, mapping the HTTP
/// outcome onto `UploadError`.
pub struct HttpUploader {
    url: String,
    client: reqwest::Client,
}

impl HttpUploader {
    pub fn new(base_url: &str) -> Self {
        Self { url: format!("{base_url}/uploads"), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, item: &QueueItem) -> Result<Value, UploadError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "id": item.id,
                "name": item.payload.name,
                "projectId": item.project_id,
                "attributes": item.attributes,
            }))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| UploadError::Rejected(e.to_string()));
        }
        if status.is_server_error() {
            return Err(UploadError::Network(format!("server error: {status}")));
        }
        Err(UploadError::Rejected(format!("client error: {status}")))
    }
}
