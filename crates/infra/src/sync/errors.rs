//! Upload worker errors

use std::time::Duration;

use thiserror::Error;

/// Lifecycle failures of the background upload worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker already running")]
    AlreadyRunning,

    #[error("Worker not running")]
    NotRunning,

    #[error("Worker task panicked: {0}")]
    Panicked(String),

    #[error("Worker did not stop within {0:?}")]
    JoinTimeout(Duration),
}

impl From<WorkerError> for sitecap_domain::SitecapError {
    fn from(value: WorkerError) -> Self {
        sitecap_domain::SitecapError::Internal(value.to_string())
    }
}
