//! Configuration structures
//!
//! Every section has defaults so partial configuration files are accepted.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_JOIN_TIMEOUT_SECS, DEFAULT_PASS_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_PROBE_URL, DEFAULT_QUEUE_FILE, MAX_ERROR_LEN,
    MAX_RETRY_ATTEMPTS, UPLOAD_QUEUE_KEY,
};
use crate::errors::{Result, SitecapError};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub store: StoreConfig,
    pub network: NetworkConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the queue cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue.max_attempts == 0 {
            return Err(SitecapError::Config("queue.max_attempts must be at least 1".into()));
        }
        if self.store.key.trim().is_empty() {
            return Err(SitecapError::Config("store.key must not be empty".into()));
        }
        if self.store.pool_size == 0 {
            return Err(SitecapError::Config("store.pool_size must be greater than 0".into()));
        }
        if self.network.timeout_ms == 0 {
            return Err(SitecapError::Config("network.timeout_ms must be greater than 0".into()));
        }
        if self.worker.poll_interval_secs == 0 || self.worker.pass_timeout_secs == 0 {
            return Err(SitecapError::Config("worker intervals must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Retry policy and queue housekeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_attempts: u32,
    /// Reset `processing` items to `pending` when the queue is opened.
    pub reset_stale_on_open: bool,
    pub max_error_len: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            reset_stale_on_open: true,
            max_error_len: MAX_ERROR_LEN,
        }
    }
}

/// Durable store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Sqlite,
}

crate::impl_domain_status_conversions!(StoreBackend {
    File => "file",
    Sqlite => "sqlite"
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// JSON file path for `file`, database path for `sqlite`.
    pub path: PathBuf,
    /// Row key used by the `sqlite` backend.
    pub key: String,
    pub pool_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            path: PathBuf::from(DEFAULT_QUEUE_FILE),
            key: UPLOAD_QUEUE_KEY.to_string(),
            pool_size: 2,
        }
    }
}

/// Connectivity gate settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// When false the gate always reports connected.
    pub check_enabled: bool,
    pub probe_url: String,
    pub timeout_ms: u64,
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            check_enabled: true,
            probe_url: DEFAULT_PROBE_URL.to_string(),
            timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

/// Background pass scheduling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub pass_timeout_secs: u64,
    pub join_timeout_secs: u64,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            pass_timeout_secs: DEFAULT_PASS_TIMEOUT_SECS,
            join_timeout_secs: DEFAULT_JOIN_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
