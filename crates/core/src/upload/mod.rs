//! Offline-tolerant upload queue: storage port, queue operations, the
//! dispatcher that drains it and the network gate in front of it.

pub mod dispatcher;
pub mod gate;
pub mod ports;
pub mod queue;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use dispatcher::Dispatcher;
pub use gate::{NetworkGate, StaticConnectivity};
pub use ports::{upload_fn, ConnectivityProbe, FnUploader, ProgressObserver, QueueStore, Uploader};
pub use queue::UploadQueue;
