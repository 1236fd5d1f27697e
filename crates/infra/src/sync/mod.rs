//! Background synchronisation of the upload queue
//!
//! The worker follows the runtime rules used across this crate: join
//! handles are tracked, cancellation is explicit, and every pass is bounded
//! by a timeout.

mod errors;
pub mod upload_worker;

pub use errors::WorkerError;
pub use upload_worker::{UploadWorker, UploadWorkerConfig};
