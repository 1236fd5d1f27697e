//! # Sitecap Infrastructure
//!
//! Infrastructure implementations of the upload queue ports.
//!
//! This crate contains:
//! - Durable queue stores (JSON file, SQLite key/value blob)
//! - The HTTP connectivity probe
//! - Configuration loading and logging bootstrap
//! - The background upload worker
//!
//! ## Architecture
//! - Implements traits defined in `sitecap-core`
//! - Contains all "impure" code (file system, SQLite, HTTP)

pub mod config;
pub mod errors;
pub mod network;
pub mod observability;
pub mod storage;
pub mod sync;

// Re-export commonly used items
pub use errors::InfraError;
pub use network::{probe_from_config, HttpConnectivityProbe};
pub use observability::init_logging;
pub use storage::{open_store, FileQueueStore, SqliteQueueStore};
pub use sync::{UploadWorker, UploadWorkerConfig, WorkerError};
