//! Durable queue store adapters

pub mod file_store;
pub mod sqlite_store;

use std::sync::Arc;

use sitecap_core::QueueStore;
use sitecap_domain::{Result, StoreBackend, StoreConfig};

pub use file_store::FileQueueStore;
pub use sqlite_store::SqliteQueueStore;

/// Build the store selected by `config.backend`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn QueueStore>> {
    match config.backend {
        StoreBackend::File => Ok(Arc::new(FileQueueStore::new(&config.path))),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteQueueStore::open(
            &config.path,
            config.key.clone(),
            config.pool_size,
        )?)),
    }
}
