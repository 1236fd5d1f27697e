//! JSON file queue store.
//!
//! The queue is one JSON array. Saves go to a sibling temp file which is
//! fsynced and then renamed over the target, so a crash leaves either the
//! previous or the new queue on disk.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sitecap_core::QueueStore;
use sitecap_domain::{QueueItem, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::errors::to_domain;

#[derive(Debug, Clone)]
pub struct FileQueueStore {
    path: PathBuf,
}

impl FileQueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> &Path {
        self.path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."))
    }

    /// Flush the directory entry so the rename itself survives power loss.
    #[cfg(unix)]
    async fn sync_parent_dir(&self) -> Result<()> {
        let dir = fs::File::open(self.parent_dir()).await.map_err(to_domain)?;
        dir.sync_all().await.map_err(to_domain)
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_async)]
    async fn sync_parent_dir(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl QueueStore for FileQueueStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<QueueItem>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Queue file does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(to_domain(e)),
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let items: Vec<QueueItem> = serde_json::from_slice(&data).map_err(to_domain)?;
        debug!(item_count = items.len(), "Loaded upload queue");
        Ok(items)
    }

    #[instrument(skip(self, items), fields(path = %self.path.display(), item_count = items.len()))]
    async fn save(&self, items: &[QueueItem]) -> Result<()> {
        let data = serde_json::to_vec(items).map_err(to_domain)?;
        let temp_path = self.temp_path();

        fs::create_dir_all(self.parent_dir()).await.map_err(to_domain)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await
            .map_err(to_domain)?;
        file.write_all(&data).await.map_err(to_domain)?;
        file.sync_all().await.map_err(to_domain)?;
        drop(file);

        fs::rename(&temp_path, &self.path).await.map_err(to_domain)?;
        self.sync_parent_dir().await?;

        debug!(bytes = data.len(), "Persisted upload queue");
        Ok(())
    }
}
