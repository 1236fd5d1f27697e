//! SQLite key/value queue store.
//!
//! The whole queue lives as one JSON blob in `kv_store`, keyed by the
//! configured store key. Connections come from an r2d2 pool and every
//! statement runs on the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use sitecap_core::QueueStore;
use sitecap_domain::{QueueItem, Result, SitecapError};
use tokio::task;
use tracing::{debug, info, instrument};

use crate::errors::to_domain;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const SELECT_SQL: &str = "SELECT value FROM kv_store WHERE key = ?1";
const UPSERT_SQL: &str = "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

type SqlitePool = Pool<SqliteConnectionManager>;

pub struct SqliteQueueStore {
    pool: Arc<SqlitePool>,
    path: PathBuf,
    key: String,
}

impl SqliteQueueStore {
    /// Open (creating if needed) the database at `path` and ensure the
    /// `kv_store` table exists.
    pub fn open<P: AsRef<Path>>(path: P, key: impl Into<String>, pool_size: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let key = key.into();
        if key.trim().is_empty() {
            return Err(SitecapError::Config("sqlite store key must not be empty".into()));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(to_domain)?;
        }

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager).map_err(to_domain)?;

        let conn = pool.get().map_err(to_domain)?;
        conn.execute_batch(SCHEMA_SQL).map_err(to_domain)?;
        drop(conn);

        info!(
            db_path = %path.display(),
            key = %key,
            max_connections = pool.max_size(),
            "sqlite queue store initialised"
        );

        Ok(Self { pool: Arc::new(pool), path, key })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Verify the database answers a trivial query.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.pool.get().map_err(to_domain)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0)).map_err(to_domain)?;
        Ok(())
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    #[instrument(skip(self), fields(key = %self.key))]
    async fn load(&self) -> Result<Vec<QueueItem>> {
        let pool = Arc::clone(&self.pool);
        let key = self.key.clone();

        let blob = task::spawn_blocking(move || -> Result<Option<String>> {
            let conn = pool.get().map_err(to_domain)?;
            conn.query_row(SELECT_SQL, params![key], |row| row.get::<_, String>(0))
                .optional()
                .map_err(to_domain)
        })
        .await
        .map_err(to_domain)??;

        let Some(blob) = blob else {
            debug!("No queue row stored yet");
            return Ok(Vec::new());
        };

        let items: Vec<QueueItem> = serde_json::from_str(&blob).map_err(to_domain)?;
        debug!(item_count = items.len(), "Loaded upload queue");
        Ok(items)
    }

    #[instrument(skip(self, items), fields(key = %self.key, item_count = items.len()))]
    async fn save(&self, items: &[QueueItem]) -> Result<()> {
        let blob = serde_json::to_string(items).map_err(to_domain)?;
        let pool = Arc::clone(&self.pool);
        let key = self.key.clone();
        let updated_at = Utc::now().timestamp_millis();

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get().map_err(to_domain)?;
            let tx = conn.transaction().map_err(to_domain)?;
            tx.execute(UPSERT_SQL, params![key, blob, updated_at]).map_err(to_domain)?;
            tx.commit().map_err(to_domain)
        })
        .await
        .map_err(to_domain)?
    }
}
