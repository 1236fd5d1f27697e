//! # Sitecap Core
//!
//! Queue logic for deferred uploads - no infrastructure dependencies.
//!
//! This crate contains:
//! - The queue operations over an abstract [`QueueStore`]
//! - The [`Dispatcher`] that drains the queue through an [`Uploader`]
//! - The [`NetworkGate`] that skips passes while offline
//!
//! Storage backends, the HTTP probe and the background worker live in
//! `sitecap-infra`.

pub mod clock;
pub mod upload;

pub use clock::{Clock, SystemClock};
pub use upload::{
    upload_fn, ConnectivityProbe, Dispatcher, FnUploader, NetworkGate, ProgressObserver,
    QueueStore, StaticConnectivity, UploadQueue, Uploader,
};
