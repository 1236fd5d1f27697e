//! Domain types for the upload queue

pub mod queue;

pub use queue::{
    Attributes, FileRef, ItemKind, ItemPatch, ItemStatus, PassSummary, ProgressEvent,
    ProgressStatus, QueueItem, QueueStats,
};
