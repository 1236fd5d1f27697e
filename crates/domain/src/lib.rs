//! # Sitecap Domain
//!
//! Data types for the offline upload queue.
//!
//! This crate contains:
//! - Queue records (`QueueItem`, `ItemPatch`) and derived values (`QueueStats`,
//!   `PassSummary`, `ProgressEvent`)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Queue constants
//!
//! ## Architecture
//! - No dependencies on other sitecap crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
