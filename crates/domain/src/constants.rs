//! Queue constants
//!
//! Defaults shared by the queue service, the stores, and configuration.

/// Attempts allowed before an item is parked as `failed`.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Key under which the queue blob is persisted in key/value stores.
pub const UPLOAD_QUEUE_KEY: &str = "upload_queue";

/// Default file name for the JSON file store.
pub const DEFAULT_QUEUE_FILE: &str = "upload_queue.json";

/// Longest `lastError` text kept on an item.
pub const MAX_ERROR_LEN: usize = 256;

// Background worker
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_PASS_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 5;

// Connectivity probe
pub const DEFAULT_PROBE_URL: &str = "https://clients3.google.com/generate_204";
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;
